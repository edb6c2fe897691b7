//! DuckDuckGo news search client
//!
//! News search is a two step exchange: the search page hands out a `vqd`
//! token for the query, which the `news.js` endpoint then requires. Both
//! steps are unauthenticated and rate limited on DuckDuckGo's side, so the
//! client throttles itself with a shared `governor` limiter.

use super::{NewsItem, NewsSource};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::DateTime;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const DEFAULT_BASE_URL: &str = "https://duckduckgo.com/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-newsletter/0.1)";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    #[serde(default)]
    date: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: Option<String>,
}

/// DuckDuckGo news client with rate limiting
pub struct DuckDuckGoNewsClient {
    client: Client,
    base_url: Url,
    region: String,
    rate_limiter: SharedRateLimiter,
    vqd_pattern: Regex,
    tag_pattern: Regex,
}

impl DuckDuckGoNewsClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `timeout` - Per-request timeout
    /// * `rate_limit` - Searches per minute
    pub fn new(timeout: Duration, rate_limit: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| StockError::ConfigError(e.to_string()))?,
            region: "wt-wt".to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            vqd_pattern: Regex::new(r#"vqd=["']?([0-9-]+)"#)
                .map_err(|e| StockError::ConfigError(e.to_string()))?,
            tag_pattern: Regex::new(r"<[^>]*>").map_err(|e| StockError::ConfigError(e.to_string()))?,
        })
    }

    /// Point the client at another host (mirrors, proxies)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the search region (e.g. `us-en`; default `wt-wt`, no region)
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StockError::ConfigError(format!("invalid DuckDuckGo URL: {e}")))
    }

    /// Fetch the `vqd` token that authorises a search for `query`
    async fn fetch_vqd(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint("")?)
            .query(&[("q", query)])
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;

        self.extract_vqd(&body).ok_or_else(|| {
            StockError::ApiError(format!("DuckDuckGo returned no vqd token for '{query}'"))
        })
    }

    fn extract_vqd(&self, body: &str) -> Option<String> {
        self.vqd_pattern
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Turn a `news.js` body into news items, dropping duplicates and empty hits
    fn parse_news(&self, body: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        let response: NewsResponse = serde_json::from_str(body)?;
        let mut seen = HashSet::new();

        Ok(response
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty() && !r.title.is_empty())
            .filter(|r| seen.insert(r.url.clone()))
            .take(max_results)
            .map(|r| NewsItem {
                title: self.clean_text(&r.title),
                snippet: self.clean_text(&r.excerpt),
                url: r.url,
                source: r.source.filter(|s| !s.is_empty()),
                date: r.date.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            })
            .collect())
    }

    fn clean_text(&self, text: &str) -> String {
        html_decode(&self.tag_pattern.replace_all(text, ""))
            .trim()
            .to_string()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        warn!(%status, "DuckDuckGo refused the request");
        return Err(StockError::RateLimitExceeded {
            provider: "duckduckgo".to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StockError::ApiError(format!(
            "DuckDuckGo error {status}: {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    Ok(response)
}

/// Decode the entities DuckDuckGo emits; `&amp;` goes last so `&amp;lt;`
/// stays `&lt;`
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[async_trait]
impl NewsSource for DuckDuckGoNewsClient {
    async fn search_news(&self, query: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;
        let vqd = self.fetch_vqd(query).await?;

        debug!(query, "Searching DuckDuckGo news");
        let response = self
            .client
            .get(self.endpoint("news.js")?)
            .query(&[
                ("l", self.region.as_str()),
                ("o", "json"),
                ("noamp", "1"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("p", "-1"),
            ])
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;

        self.parse_news(&body, max_results)
    }
}
