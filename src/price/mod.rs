//! Price lookup collaborators for the rebalancer.
//!
//! The rebalancer only sees [`PriceSource`]. [`StaticPrices`] serves prices held
//! in memory (or read from a csv file) and [`alpha_vantage::AlphaVantage`] quotes
//! daily closing prices over HTTP.

pub mod alpha_vantage;
pub mod rate_limit;

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::{Dollar, error::PriceError};

/// Prices per symbol, valid for a single date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceTable {
    prices: HashMap<String, Dollar>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, price: Dollar) -> Option<Dollar> {
        self.prices.insert(symbol.into(), price)
    }

    pub fn get(&self, symbol: &str) -> Option<Dollar> {
        self.prices.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Dollar)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (S, Dollar)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().map(|(s, p)| (s.into(), p)).collect(),
        }
    }
}

/// Quotes prices for a set of symbols on a date.
///
/// Implementations may leave out symbols they cannot price; the caller decides
/// whether a missing entry is fatal. Retries and throttling are the
/// implementation's business.
#[cfg_attr(test, mockall::automock)]
pub trait PriceSource {
    fn prices(&self, symbols: &BTreeSet<String>, date: NaiveDate)
    -> Result<PriceTable, PriceError>;
}

impl<T: PriceSource + ?Sized> PriceSource for &T {
    fn prices(
        &self,
        symbols: &BTreeSet<String>,
        date: NaiveDate,
    ) -> Result<PriceTable, PriceError> {
        (**self).prices(symbols, date)
    }
}

impl<T: PriceSource + ?Sized> PriceSource for Box<T> {
    fn prices(
        &self,
        symbols: &BTreeSet<String>,
        date: NaiveDate,
    ) -> Result<PriceTable, PriceError> {
        (**self).prices(symbols, date)
    }
}

/// In-memory prices, keyed by date.
#[derive(Clone, Debug, Default)]
pub struct StaticPrices {
    days: HashMap<NaiveDate, PriceTable>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_date(date: NaiveDate, table: PriceTable) -> Self {
        let mut prices = Self::new();
        prices.days.insert(date, table);
        prices
    }

    pub fn insert(&mut self, date: NaiveDate, symbol: impl Into<String>, price: Dollar) {
        self.days.entry(date).or_default().insert(symbol, price);
    }

    /// Reads `Date,Symbol,Price` rows. Dates use `YYYY-MM-DD`.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, PriceError> {
        let path = path.as_ref();
        let read_err = |source| PriceError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;
        let mut prices = Self::new();
        for row in csv_reader.deserialize::<PriceRow>() {
            let row = row.map_err(read_err)?;
            debug!(?row, "parsed price row");
            prices.insert(row.date, row.symbol, row.price);
        }
        Ok(prices)
    }
}

impl PriceSource for StaticPrices {
    fn prices(
        &self,
        symbols: &BTreeSet<String>,
        date: NaiveDate,
    ) -> Result<PriceTable, PriceError> {
        let Some(day) = self.days.get(&date) else {
            return Ok(PriceTable::new());
        };
        Ok(symbols
            .iter()
            .filter_map(|s| day.get(s).map(|p| (s.clone(), p)))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PriceRow {
    date: NaiveDate,
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}
