//! Tables printed by the command line front end.

use tabled::{Table, Tabled, settings::Style};

use crate::{Action, Portfolio, Rebalance};

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Action")]
    side: String,
    #[tabled(rename = "Shares")]
    shares: u64,
    #[tabled(rename = "Held")]
    held: u64,
    #[tabled(rename = "Allocation")]
    allocation: String,
}

impl From<&Action> for ActionRow {
    fn from(action: &Action) -> Self {
        Self {
            symbol: action.symbol.clone(),
            side: match action.is_liquidation() {
                true => "sell all".to_string(),
                false => action.side().to_string(),
            },
            shares: action.delta.unsigned_abs(),
            held: action.original_shares,
            allocation: format!("{:.2}%", action.allocation),
        }
    }
}

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Shares")]
    shares: u64,
    #[tabled(rename = "Allocation")]
    allocation: String,
}

/// Sells before buys, largest sale first.
pub fn actions_table(rebalance: &Rebalance) -> String {
    let mut actions: Vec<&Action> = rebalance.actions.iter().collect();
    actions.sort_by_key(|a| a.delta);
    Table::new(actions.into_iter().map(ActionRow::from))
        .with(Style::rounded())
        .to_string()
}

/// Largest allocation first, percentages rounded to whole numbers.
pub fn holdings_table(portfolio: &Portfolio) -> String {
    let mut holdings: Vec<_> = portfolio.iter().collect();
    holdings.sort_by(|a, b| b.allocation.cmp(&a.allocation));
    Table::new(holdings.into_iter().map(|h| HoldingRow {
        symbol: h.symbol.clone(),
        shares: h.shares,
        allocation: format!("{}%", h.allocation.round()),
    }))
    .with(Style::rounded())
    .to_string()
}
