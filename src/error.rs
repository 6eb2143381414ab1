use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("symbol {0} appears more than once in the portfolio")]
    DuplicateSymbol(String),
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Errors reported by a [`PriceSource`](crate::price::PriceSource).
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("no quote for {symbol} on {date}")]
    NoQuote { symbol: String, date: NaiveDate },
    #[error("price provider rejected the request for {symbol}: {message}")]
    Api { symbol: String, message: String },
    #[error("price provider rate limit hit while fetching {symbol}")]
    RateLimited { symbol: String },
    #[error("http request for {symbol} failed")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response for {symbol}: {message}")]
    Malformed { symbol: String, message: String },
    #[error("failed to read price file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Reasons a single `balance` call can fail. None of them leave partial results.
#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("no price available for {symbol} on {date}")]
    PriceUnavailable { symbol: String, date: NaiveDate },
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),
    #[error("price for {symbol} must be positive, got {price}")]
    InvalidPrice { symbol: String, price: Decimal },
    #[error("price lookup failed")]
    PriceSource(#[source] PriceError),
    #[error("arithmetic overflow while computing {0}")]
    Overflow(String),
}

impl From<PriceError> for RebalanceError {
    fn from(err: PriceError) -> Self {
        match err {
            PriceError::NoQuote { symbol, date } => Self::PriceUnavailable { symbol, date },
            other => Self::PriceSource(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
