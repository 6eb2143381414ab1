//! Computes the trades that move a portfolio onto a target allocation.
//!
//! Symbols held but not requested are sold off first. Every requested symbol
//! then gets the whole number of shares closest to its share of the current
//! portfolio value, rounding half to even.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use tracing::debug;

use crate::{
    Dollar, Percent,
    error::RebalanceError,
    portfolio::{Holding, Portfolio},
    price::{PriceSource, PriceTable},
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
            Side::Hold => write!(f, "hold"),
        }
    }
}

/// Why an action was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Held but not requested: the whole position is sold.
    Liquidate,
    /// Requested: moved onto its target allocation.
    Target,
}

/// The trade for one symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub symbol: String,
    pub kind: ActionKind,
    /// Shares held before the trade, zero for symbols not currently held.
    pub original_shares: u64,
    /// Shares to buy (positive) or sell (negative).
    pub delta: i64,
    /// Share of the portfolio value the symbol ends up with, in percent.
    pub allocation: Percent,
}

impl Action {
    pub fn side(&self) -> Side {
        match self.delta {
            d if d > 0 => Side::Buy,
            d if d < 0 => Side::Sell,
            _ => Side::Hold,
        }
    }

    pub fn resulting_shares(&self) -> u64 {
        self.original_shares.saturating_add_signed(self.delta)
    }

    /// Whether the symbol is dropped because it is not requested, even when
    /// no shares are actually held.
    pub fn is_liquidation(&self) -> bool {
        self.kind == ActionKind::Liquidate
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} shares",
            self.symbol,
            self.side(),
            self.delta.unsigned_abs()
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rebalance {
    /// Liquidations first, then one action per requested symbol.
    pub actions: Vec<Action>,
    /// Holdings after applying the actions. Symbols left with a zero
    /// allocation are dropped even if rounding leaves shares behind.
    pub updated: Portfolio,
    /// Value of the current portfolio at the quoted prices.
    pub total_value: Dollar,
}

/// Rejects negative targets and targets adding up to more than 100%.
pub fn validate_allocations(requested: &Portfolio) -> Result<(), RebalanceError> {
    if let Some(h) = requested.iter().find(|h| h.allocation < Decimal::ZERO) {
        return Err(RebalanceError::InvalidAllocation(format!(
            "{} has a negative target of {}%",
            h.symbol, h.allocation
        )));
    }
    let total = requested
        .iter()
        .try_fold(Decimal::ZERO, |acc, h| acc.checked_add(h.allocation))
        .ok_or_else(|| RebalanceError::Overflow("total allocation".to_string()))?;
    if total > HUNDRED {
        return Err(RebalanceError::InvalidAllocation(format!(
            "targets add up to {total}%, more than 100%"
        )));
    }
    Ok(())
}

pub struct Rebalancer<P> {
    source: P,
}

impl<P: PriceSource> Rebalancer<P> {
    pub fn new(source: P) -> Self {
        Self { source }
    }

    /// Computes the actions that move `current` onto the targets of
    /// `requested` at the prices quoted for `date`.
    ///
    /// The price source is asked once, for the union of both portfolios'
    /// symbols, and not at all when both are empty.
    pub fn balance(
        &self,
        current: &Portfolio,
        requested: &Portfolio,
        date: NaiveDate,
    ) -> Result<Rebalance, RebalanceError> {
        validate_allocations(requested)?;

        let symbols: BTreeSet<String> = current
            .symbols()
            .chain(requested.symbols())
            .map(str::to_owned)
            .collect();
        if symbols.is_empty() {
            return Ok(Rebalance::default());
        }

        let table = self.source.prices(&symbols, date)?;
        let prices = resolve_prices(&symbols, &table, date)?;
        let rebalance = allocate(current, requested, &prices)?;
        debug!(
            actions = ?rebalance.actions,
            total_value = %rebalance.total_value,
            "processed rebalance"
        );
        Ok(rebalance)
    }
}

/// Looks up every symbol of interest, failing on the first one without a usable price.
fn resolve_prices<'a>(
    symbols: &'a BTreeSet<String>,
    table: &PriceTable,
    date: NaiveDate,
) -> Result<HashMap<&'a str, Dollar>, RebalanceError> {
    symbols
        .iter()
        .map(|symbol| {
            let price = table
                .get(symbol)
                .ok_or_else(|| RebalanceError::PriceUnavailable {
                    symbol: symbol.clone(),
                    date,
                })?;
            if price <= Decimal::ZERO {
                return Err(RebalanceError::InvalidPrice {
                    symbol: symbol.clone(),
                    price,
                });
            }
            Ok((symbol.as_str(), price))
        })
        .collect()
}

fn allocate(
    current: &Portfolio,
    requested: &Portfolio,
    prices: &HashMap<&str, Dollar>,
) -> Result<Rebalance, RebalanceError> {
    // every symbol of either portfolio was resolved by `resolve_prices`
    let price_of = |symbol: &str| prices[symbol];
    let overflow = |what: &str| RebalanceError::Overflow(what.to_string());

    let mut actions: Vec<Action> = current
        .iter()
        .filter(|h| !requested.contains(&h.symbol))
        .map(|h| -> Result<Action, RebalanceError> {
            Ok(Action {
                symbol: h.symbol.clone(),
                kind: ActionKind::Liquidate,
                original_shares: h.shares,
                delta: signed(h.shares)
                    .map(|s| -s)
                    .ok_or_else(|| overflow("liquidation size"))?,
                allocation: Decimal::ZERO,
            })
        })
        .collect::<Result<_, _>>()?;

    let total_value = current
        .iter()
        .try_fold(Decimal::ZERO, |acc, h| {
            Decimal::from(h.shares)
                .checked_mul(price_of(&h.symbol))
                .and_then(|value| acc.checked_add(value))
        })
        .ok_or_else(|| overflow("portfolio value"))?;

    for holding in requested {
        let price = price_of(&holding.symbol);
        let fraction = holding.allocation / HUNDRED;
        let target = fraction
            .checked_mul(total_value)
            .and_then(|value| value.checked_div(price))
            .map(|shares| shares.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven))
            .and_then(|shares| shares.to_u64())
            .ok_or_else(|| overflow("target shares"))?;
        let allocation = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::from(target)
                .checked_mul(price)
                .and_then(|value| value.checked_div(total_value))
                .and_then(|share| share.checked_mul(HUNDRED))
                .ok_or_else(|| overflow("resulting allocation"))?
        };
        let original_shares = current.shares_of(&holding.symbol);
        let delta = signed(target)
            .zip(signed(original_shares))
            .and_then(|(target, original)| target.checked_sub(original))
            .ok_or_else(|| overflow("share delta"))?;
        actions.push(Action {
            symbol: holding.symbol.clone(),
            kind: ActionKind::Target,
            original_shares,
            delta,
            allocation,
        });
    }

    let updated = Portfolio::from_unique(
        actions
            .iter()
            .filter(|a| a.allocation > Decimal::ZERO)
            .map(|a| Holding::new(a.symbol.clone(), a.resulting_shares(), a.allocation))
            .collect(),
    );

    Ok(Rebalance {
        actions,
        updated,
        total_value,
    })
}

fn signed(shares: u64) -> Option<i64> {
    i64::try_from(shares).ok()
}
