//! Market data records and the collaborator traits that supply them.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub percent_change: f64,
    pub name: String,
    pub currency: String,
    pub kind: Option<String>,
}

/// One historical dividend payment for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub amount_per_share: f64,
}

impl DividendPayment {
    pub fn new(date: NaiveDate, amount_per_share: f64) -> Self {
        Self {
            date,
            amount_per_share,
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Zero-based month index, January is 0.
    pub fn month_index(&self) -> usize {
        self.date.month0() as usize
    }
}

/// Latest quotes keyed by symbol, as seen by one computation.
pub type QuoteBook = HashMap<String, Quote>;

/// Dividend history keyed by symbol, as seen by one computation.
pub type DividendLedger = HashMap<String, Vec<DividendPayment>>;

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches quotes for many symbols at once. Symbols the provider cannot
    /// resolve are left out of the result.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>>;
}

#[async_trait]
pub trait DividendProvider: Send + Sync {
    /// An empty history is a valid answer.
    async fn fetch_dividend_history(&self, symbol: &str) -> Result<Vec<DividendPayment>>;
}

#[async_trait]
pub trait HistoricalPriceProvider: Send + Sync {
    /// Daily close on `date`. `None` when the market has no bar for that day.
    async fn fetch_close_on(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>>;
}
