use std::{collections::HashMap, path::Path};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Percent, error::PortfolioError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Holding {
    pub symbol: String,
    pub shares: u64,
    pub allocation: Percent,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, shares: u64, allocation: Percent) -> Self {
        Self {
            symbol: symbol.into(),
            shares,
            allocation,
        }
    }

    /// A holding as it appears in a current portfolio.
    pub fn with_shares(symbol: impl Into<String>, shares: u64) -> Self {
        Self::new(symbol, shares, Decimal::ZERO)
    }

    /// A holding as it appears in a requested portfolio.
    pub fn with_allocation(symbol: impl Into<String>, allocation: Percent) -> Self {
        Self::new(symbol, 0, allocation)
    }
}

/// Holdings keyed by symbol. Iteration follows insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Portfolio {
    holdings: Vec<Holding>,
    index: HashMap<String, usize>,
}

impl Portfolio {
    pub fn new(holdings: impl IntoIterator<Item = Holding>) -> Result<Self, PortfolioError> {
        let mut portfolio = Self::default();
        for holding in holdings {
            portfolio.push(holding)?;
        }
        Ok(portfolio)
    }

    /// Builds a portfolio from holdings already known to have distinct symbols.
    pub(crate) fn from_unique(holdings: Vec<Holding>) -> Self {
        let index = holdings
            .iter()
            .enumerate()
            .map(|(i, h)| (h.symbol.clone(), i))
            .collect();
        Self { holdings, index }
    }

    fn push(&mut self, holding: Holding) -> Result<(), PortfolioError> {
        if self.index.contains_key(&holding.symbol) {
            return Err(PortfolioError::DuplicateSymbol(holding.symbol));
        }
        self.index
            .insert(holding.symbol.clone(), self.holdings.len());
        self.holdings.push(holding);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.holdings.iter().map(|h| h.symbol.as_str())
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        self.index.get(symbol).map(|&i| &self.holdings[i])
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Shares held for `symbol`, zero when it is not part of the portfolio.
    pub fn shares_of(&self, symbol: &str) -> u64 {
        self.get(symbol).map_or(0, |h| h.shares)
    }

    pub fn total_allocation(&self) -> Percent {
        self.holdings.iter().map(|h| h.allocation).sum()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Reads a `Symbol,Shares` csv file of current holdings.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let path = path.as_ref();
        let read_err = |source| PortfolioError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;
        let mut portfolio = Self::default();
        for row in csv_reader.deserialize::<HoldingRow>() {
            let row = row.map_err(read_err)?;
            debug!(?row, "parsed row");
            portfolio.push(Holding::with_shares(row.symbol, row.shares))?;
        }
        Ok(portfolio)
    }

    /// Writes the portfolio as `Symbol,Shares,Allocation` rows.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), PortfolioError> {
        let path = path.as_ref();
        let write_err = |source| PortfolioError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
        for holding in &self.holdings {
            writer.serialize(holding).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| write_err(csv::Error::from(e)))?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = &'a Holding;
    type IntoIter = std::slice::Iter<'a, Holding>;

    fn into_iter(self) -> Self::IntoIter {
        self.holdings.iter()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HoldingRow {
    symbol: String,
    shares: u64,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn rejects_duplicate_symbols() {
        let err = Portfolio::new([
            Holding::with_shares("ONE", 1),
            Holding::with_shares("ONE", 2),
        ])
        .unwrap_err();
        assert!(matches!(err, PortfolioError::DuplicateSymbol(s) if s == "ONE"));
    }

    #[test]
    fn absent_symbol_has_zero_shares() {
        let portfolio = Portfolio::new([Holding::with_shares("ONE", 3)]).unwrap();
        assert_eq!(portfolio.shares_of("ONE"), 3);
        assert_eq!(portfolio.shares_of("TWO"), 0);
    }

    #[test]
    fn keeps_insertion_order() {
        let portfolio = Portfolio::new([
            Holding::with_allocation("ZZZ", dec!(10)),
            Holding::with_allocation("AAA", dec!(20)),
        ])
        .unwrap();
        assert_eq!(portfolio.symbols().collect::<Vec<_>>(), ["ZZZ", "AAA"]);
        assert_eq!(portfolio.total_allocation(), dec!(30));
    }

    #[test]
    fn loads_holdings_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Symbol,Shares\nAAPL, 50\nGOOG,200").unwrap();
        let portfolio = Portfolio::load_from_file(file.path()).unwrap();
        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.shares_of("AAPL"), 50);
        assert_eq!(portfolio.shares_of("GOOG"), 200);
    }

    #[test]
    fn duplicate_rows_in_csv_fail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Symbol,Shares\nAAPL,50\nAAPL,1").unwrap();
        assert!(matches!(
            Portfolio::load_from_file(file.path()),
            Err(PortfolioError::DuplicateSymbol(_))
        ));
    }

    #[test]
    fn saved_file_lists_allocations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updated.csv");
        let portfolio = Portfolio::new([Holding::new("ONE", 1, dec!(50))]).unwrap();
        portfolio.save_to_file(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Symbol,Shares,Allocation\nONE,1,50\n");
    }
}
