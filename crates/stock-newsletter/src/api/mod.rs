//! Market data sources
//!
//! The tools talk to the outside world through [`PriceSource`] and
//! [`NewsSource`], so tests can swap in mocks.

pub mod duckduckgo;
pub mod yahoo;

pub use duckduckgo::DuckDuckGoNewsClient;
pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily price bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjclose: f64,
    pub volume: u64,
}

/// One news search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Daily price history provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily quotes for `symbol` between `start` and `end` (inclusive), oldest first
    async fn daily_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Quote>>;
}

/// News search provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Up to `max_results` recent news items matching `query`
    async fn search_news(&self, query: &str, max_results: usize) -> Result<Vec<NewsItem>>;
}
