//! Tool for searching recent market news

use agent_core::Result as AgentResult;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::api::{NewsItem, NewsSource};
use crate::cache::{CacheKey, DataCache};
use crate::error::{Result, StockError};

/// Tool for searching news about a stock or asset
pub struct NewsSearchTool {
    source: Arc<dyn NewsSource>,
    cache: DataCache<Vec<NewsItem>>,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct NewsSearchParams {
    #[serde(alias = "q", alias = "ticket")]
    query: String,
}

impl NewsSearchTool {
    /// Create a new news search tool returning at most `max_results` items
    pub fn new(source: Arc<dyn NewsSource>, cache: DataCache<Vec<NewsItem>>, max_results: usize) -> Self {
        Self {
            source,
            cache,
            max_results,
        }
    }

    async fn search(&self, params: NewsSearchParams) -> Result<Value> {
        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err(StockError::ApiError("search query must not be empty".to_string()));
        }

        let cache_key = CacheKey::new(
            query.to_lowercase(),
            "news_search",
            json!({ "max_results": self.max_results }),
        );
        let results = self
            .cache
            .get_or_fetch(cache_key, || self.source.search_news(&query, self.max_results))
            .await?;

        tracing::debug!(query = %query, count = results.len(), "News search finished");

        Ok(json!({
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: NewsSearchParams = serde_json::from_value(params).map_err(|e| {
            agent_core::Error::ProcessingFailed(format!("Invalid parameters: {e}"))
        })?;

        Ok(self.search(params).await?)
    }

    fn name(&self) -> &'static str {
        "duckduckgo_news_search"
    }

    fn description(&self) -> &'static str {
        "Search recent news articles with DuckDuckGo. Search one stock or asset per call \
         (e.g. 'AAPL stock', 'BTC'). Returns titles, snippets, sources, dates and links."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "News search query, usually the ticker or company name"
                }
            },
            "required": ["query"]
        })
    }
}
