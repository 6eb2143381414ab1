//! Daily closing prices from the Alpha Vantage `TIME_SERIES_DAILY` endpoint.
//!
//! The free tier allows 5 calls per minute, so every request first takes a
//! token from a [`RateLimiter`]. One request is made per symbol.

use std::{
    collections::{BTreeSet, HashMap},
    str::FromStr,
    time::Duration,
};

use chrono::NaiveDate;
use reqwest::{StatusCode, blocking::Client};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{PriceSource, PriceTable, rate_limit::RateLimiter};
use crate::{config::AlphaVantageConfig, error::PriceError};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const CLOSE_FIELD: &str = "4. close";

pub struct AlphaVantage {
    client: Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, HashMap<String, String>>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl AlphaVantage {
    pub fn new(
        api_key: impl Into<String>,
        config: &AlphaVantageConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            limiter: RateLimiter::per_minute(config.requests_per_minute, 1),
            max_retries: config.max_retries,
        })
    }

    fn fetch_close(&self, symbol: &str, date: NaiveDate) -> Result<Decimal, PriceError> {
        let mut attempt = 0;
        loop {
            self.limiter.acquire();
            match self.request(symbol).and_then(|body| close_price(&body, symbol, date)) {
                Err(PriceError::RateLimited { .. }) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(symbol, attempt, "throttled by price provider, retrying");
                }
                result => return result,
            }
        }
    }

    fn request(&self, symbol: &str) -> Result<String, PriceError> {
        let http_err = |source| PriceError::Http {
            symbol: symbol.to_string(),
            source,
        };
        debug!(symbol, base_url = %self.base_url, "requesting daily time series");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| http_err(e.without_url()))?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
        response
            .error_for_status()
            .and_then(|r| r.text())
            .map_err(|e| http_err(e.without_url()))
    }
}

impl PriceSource for AlphaVantage {
    fn prices(
        &self,
        symbols: &BTreeSet<String>,
        date: NaiveDate,
    ) -> Result<PriceTable, PriceError> {
        let mut table = PriceTable::new();
        for symbol in symbols {
            let close = self.fetch_close(symbol, date)?;
            info!(%symbol, %date, %close, "fetched closing price");
            table.insert(symbol.clone(), close);
        }
        Ok(table)
    }
}

fn is_throttle_message(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("call frequency") || msg.contains("rate limit")
}

/// Extracts the closing price for `date` from a `TIME_SERIES_DAILY` body.
fn close_price(body: &str, symbol: &str, date: NaiveDate) -> Result<Decimal, PriceError> {
    let malformed = |message: String| PriceError::Malformed {
        symbol: symbol.to_string(),
        message,
    };
    let response: TimeSeriesResponse =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    if let Some(message) = response.error_message {
        return Err(PriceError::Api {
            symbol: symbol.to_string(),
            message,
        });
    }
    for message in [&response.note, &response.information].into_iter().flatten() {
        if is_throttle_message(message) {
            return Err(PriceError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
    }

    let Some(series) = response.time_series else {
        let message = response
            .information
            .or(response.note)
            .unwrap_or_else(|| "missing daily time series".to_string());
        return Err(PriceError::Api {
            symbol: symbol.to_string(),
            message,
        });
    };
    let key = date.format("%Y-%m-%d").to_string();
    let close = series
        .get(&key)
        .and_then(|day| day.get(CLOSE_FIELD))
        .ok_or_else(|| PriceError::NoQuote {
            symbol: symbol.to_string(),
            date,
        })?;
    Decimal::from_str(close.trim()).map_err(|e| malformed(format!("close price {close:?}: {e}")))
}
