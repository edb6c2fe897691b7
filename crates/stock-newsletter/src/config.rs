//! Configuration for the newsletter service

use crate::error::{Result, StockError};
use agent_llm::providers::OpenAIConfig;
use agent_utils::{env_or, env_parse};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default OpenAI-compatible endpoint
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Length of the trailing price window when no dates are configured
const DEFAULT_WINDOW_DAYS: u64 = 365;

/// Configuration for the newsletter service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM endpoint
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    pub openai_api_base: String,

    /// Chat model used by every agent and the manager
    pub model: String,

    /// Web server bind host
    pub host: String,

    /// Web server bind port
    pub port: u16,

    /// First day of the price window (default: one year before the end)
    pub price_start: Option<NaiveDate>,

    /// Last day of the price window (default: today)
    pub price_end: Option<NaiveDate>,

    /// Maximum number of news items per search
    pub news_max_results: usize,

    /// News searches allowed per minute
    pub news_rate_limit: u32,

    /// Cache TTL for price history
    pub cache_ttl_prices: Duration,

    /// Cache TTL for news searches
    pub cache_ttl_news: Duration,

    /// Timeout for data source requests
    pub request_timeout: Duration,

    /// Timeout for a single LLM request
    pub llm_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8501,
            price_start: None,
            price_end: None,
            news_max_results: 10,
            news_rate_limit: 20,
            cache_ttl_prices: Duration::from_secs(3600),
            cache_ttl_news: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(120),
        }
    }
}

impl AppConfig {
    /// Create a new configuration builder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load the configuration from environment variables
    ///
    /// | variable | field |
    /// |---|---|
    /// | `OPENAI_API_KEY` | `openai_api_key` |
    /// | `OPENAI_API_BASE` | `openai_api_base` |
    /// | `OPENAI_MODEL` | `model` |
    /// | `STOCK_CREW_HOST` / `STOCK_CREW_PORT` | `host` / `port` |
    /// | `PRICE_HISTORY_START` / `PRICE_HISTORY_END` | price window (YYYY-MM-DD) |
    /// | `NEWS_MAX_RESULTS` | `news_max_results` |
    /// | `NEWS_RATE_LIMIT` | `news_rate_limit` |
    /// | `CACHE_TTL_PRICES_SECS` / `CACHE_TTL_NEWS_SECS` | cache TTLs |
    /// | `REQUEST_TIMEOUT_SECS` / `LLM_TIMEOUT_SECS` | timeouts |
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Result<Duration> {
            Ok(env_parse::<u64>(key)?.map_or(default, Duration::from_secs))
        };

        let config = Self {
            openai_api_key: env_parse::<String>("OPENAI_API_KEY")?,
            openai_api_base: env_or("OPENAI_API_BASE", DEFAULT_API_BASE),
            model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            host: env_or("STOCK_CREW_HOST", &defaults.host),
            port: env_parse("STOCK_CREW_PORT")?.unwrap_or(defaults.port),
            price_start: env_parse("PRICE_HISTORY_START")?,
            price_end: env_parse("PRICE_HISTORY_END")?,
            news_max_results: env_parse("NEWS_MAX_RESULTS")?.unwrap_or(defaults.news_max_results),
            news_rate_limit: env_parse("NEWS_RATE_LIMIT")?.unwrap_or(defaults.news_rate_limit),
            cache_ttl_prices: secs("CACHE_TTL_PRICES_SECS", defaults.cache_ttl_prices)?,
            cache_ttl_news: secs("CACHE_TTL_NEWS_SECS", defaults.cache_ttl_news)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            llm_timeout: secs("LLM_TIMEOUT_SECS", defaults.llm_timeout)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.price_start, self.price_end) {
            if end < start {
                return Err(StockError::ConfigError(format!(
                    "price window ends ({end}) before it starts ({start})"
                )));
            }
        }

        if self.news_max_results == 0 {
            return Err(StockError::ConfigError(
                "news_max_results must be greater than 0".to_string(),
            ));
        }

        if self.news_rate_limit == 0 {
            return Err(StockError::ConfigError(
                "news_rate_limit must be greater than 0".to_string(),
            ));
        }

        let base = Url::parse(&self.openai_api_base).map_err(|e| {
            StockError::ConfigError(format!("invalid OPENAI_API_BASE '{}': {e}", self.openai_api_base))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StockError::ConfigError(format!(
                "OPENAI_API_BASE must be an http(s) URL, got '{}'",
                self.openai_api_base
            )));
        }

        Ok(())
    }

    /// Price window for a request made on `today`
    ///
    /// Missing ends default to a trailing year ending today. A start past the
    /// end is pulled back to the end, leaving a one-day window.
    pub fn price_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.price_end.unwrap_or(today);
        let start = self.price_start.unwrap_or_else(|| {
            end.checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
                .unwrap_or(end)
        });
        if start > end {
            tracing::warn!(%start, %end, "Price history start is after its end, using the end date");
            return (end, end);
        }
        (start, end)
    }

    /// Web server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Provider configuration for the LLM endpoint
    ///
    /// Local OpenAI-compatible servers accept any key, so a missing key is
    /// only rejected for the public OpenAI endpoint.
    pub fn openai_config(&self) -> Result<OpenAIConfig> {
        let api_key = match &self.openai_api_key {
            Some(key) => key.clone(),
            None if self.openai_api_base == DEFAULT_API_BASE => {
                return Err(StockError::ConfigError(
                    "OPENAI_API_KEY is required for the OpenAI API".to_string(),
                ));
            }
            None => "not-needed".to_string(),
        };

        Ok(OpenAIConfig::new(api_key)
            .with_api_base(&self.openai_api_base)
            .with_timeout(self.llm_timeout.as_secs()))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    model: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    price_start: Option<NaiveDate>,
    price_end: Option<NaiveDate>,
    news_max_results: Option<usize>,
    news_rate_limit: Option<u32>,
    cache_ttl_prices: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    request_timeout: Option<Duration>,
    llm_timeout: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the API key
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.openai_api_base = Some(base.into());
        self
    }

    /// Set the chat model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set a fixed price window
    pub fn price_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.price_start = Some(start);
        self.price_end = Some(end);
        self
    }

    /// Set the maximum number of news results
    pub fn news_max_results(mut self, max: usize) -> Self {
        self.news_max_results = Some(max);
        self
    }

    /// Set the news searches allowed per minute
    pub fn news_rate_limit(mut self, per_minute: u32) -> Self {
        self.news_rate_limit = Some(per_minute);
        self
    }

    /// Set the price cache TTL
    pub fn cache_ttl_prices(mut self, ttl: Duration) -> Self {
        self.cache_ttl_prices = Some(ttl);
        self
    }

    /// Set the news cache TTL
    pub fn cache_ttl_news(mut self, ttl: Duration) -> Self {
        self.cache_ttl_news = Some(ttl);
        self
    }

    /// Set the data source request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the LLM request timeout
    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig> {
        let defaults = AppConfig::default();

        let config = AppConfig {
            openai_api_key: self.openai_api_key,
            openai_api_base: self.openai_api_base.unwrap_or(defaults.openai_api_base),
            model: self.model.unwrap_or(defaults.model),
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            price_start: self.price_start,
            price_end: self.price_end,
            news_max_results: self.news_max_results.unwrap_or(defaults.news_max_results),
            news_rate_limit: self.news_rate_limit.unwrap_or(defaults.news_rate_limit),
            cache_ttl_prices: self.cache_ttl_prices.unwrap_or(defaults.cache_ttl_prices),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}
