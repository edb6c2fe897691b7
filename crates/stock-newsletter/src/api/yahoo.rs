//! Yahoo Finance price history client

use super::{PriceSource, Quote};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    connector: yahoo::YahooConnector,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        Ok(Self { connector })
    }
}

/// Midnight UTC of `date` as the `time` crate type the connector expects
fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| StockError::YahooFinanceError(format!("Invalid date {date}: {e}")))
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>> {
        // the end bound is exclusive upstream
        let start_odt = to_offset_datetime(start)?;
        let end_odt = to_offset_datetime(end.succ_opt().unwrap_or(end))?;

        debug!(symbol, %start, %end, "Fetching Yahoo Finance history");
        let response = self
            .connector
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                Some(Quote {
                    timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)?,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    adjclose: q.adjclose,
                    volume: q.volume,
                })
            })
            .collect())
    }
}
