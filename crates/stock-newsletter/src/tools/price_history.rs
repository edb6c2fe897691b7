//! Tool for fetching a year of daily prices and labelling the trend

use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::analysis::{PriceSummary, summarize};
use crate::api::{PriceSource, Quote};
use crate::cache::{CacheKey, DataCache};
use crate::config::AppConfig;
use crate::error::{Result, StockError};

/// Number of most recent daily rows included in the output
pub const RECENT_ROWS: usize = 30;

/// Tool for fetching daily price history for a ticker
pub struct PriceHistoryTool {
    source: Arc<dyn PriceSource>,
    cache: DataCache<Vec<Quote>>,
    config: Arc<AppConfig>,
}

#[derive(Debug, Deserialize)]
struct PriceHistoryParams {
    #[serde(alias = "symbol", alias = "ticker")]
    ticket: String,
}

#[derive(Debug, Serialize)]
struct DailyRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
    #[serde(flatten)]
    summary: PriceSummary,
    recent: Vec<DailyRow>,
}

impl PriceHistoryTool {
    /// Create a new price history tool
    pub fn new(source: Arc<dyn PriceSource>, cache: DataCache<Vec<Quote>>, config: Arc<AppConfig>) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    async fn price_report(&self, params: PriceHistoryParams, today: NaiveDate) -> Result<Value> {
        let symbol = params.ticket.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(StockError::InvalidSymbol(params.ticket));
        }

        let (start, end) = self.config.price_window(today);
        let cache_key = CacheKey::new(&symbol, "price_history", json!({ "start": start, "end": end }));

        let quotes = self
            .cache
            .get_or_fetch(cache_key, || self.source.daily_history(&symbol, start, end))
            .await?;
        let summary = summarize(&symbol, &quotes)?;

        tracing::debug!(
            symbol = %symbol,
            data_points = summary.data_points,
            trend = %summary.trend,
            "Price history summarized"
        );

        let recent = quotes[quotes.len().saturating_sub(RECENT_ROWS)..]
            .iter()
            .map(|q| DailyRow {
                date: q.timestamp.date_naive(),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();

        Ok(serde_json::to_value(PriceReport {
            symbol,
            start,
            end,
            summary,
            recent,
        })?)
    }
}

#[async_trait]
impl Tool for PriceHistoryTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: PriceHistoryParams = serde_json::from_value(params).map_err(|e| {
            agent_core::Error::ProcessingFailed(format!("Invalid parameters: {e}"))
        })?;

        Ok(self.price_report(params, Utc::now().date_naive()).await?)
    }

    fn name(&self) -> &'static str {
        "yahoo_finance_price_history"
    }

    fn description(&self) -> &'static str {
        "Fetches stocks prices for a ticket from the last year from the Yahoo Finance API. \
         Returns the price window summary (first/last close, change, high/low, SMA-20, SMA-50), \
         a trend label (up, down or sideways) and the most recent daily prices."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticket": {
                    "type": "string",
                    "description": "Stock ticker symbol (e.g., 'AAPL', 'BTC-USD')"
                }
            },
            "required": ["ticket"]
        })
    }
}
