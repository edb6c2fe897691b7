//! Error types for the newsletter crate

use agent_crew::CrewError;
use thiserror::Error;

/// Errors raised by data sources, tools, configuration and the crew run
#[derive(Debug, Error)]
pub enum StockError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// The remote service refused the request (rate limit or bot check)
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Server socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The research crew failed
    #[error(transparent)]
    Crew(#[from] CrewError),

    /// LLM provider setup failed
    #[error("LLM error: {0}")]
    Llm(#[from] agent_llm::LLMError),
}

/// Result type alias for newsletter operations
pub type Result<T> = std::result::Result<T, StockError>;

/// Tool failures travel back to the model as processing errors
impl From<StockError> for agent_core::Error {
    fn from(err: StockError) -> Self {
        agent_core::Error::ProcessingFailed(err.to_string())
    }
}

impl From<agent_utils::ConfigError> for StockError {
    fn from(err: agent_utils::ConfigError) -> Self {
        StockError::ConfigError(err.to_string())
    }
}
