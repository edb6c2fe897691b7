//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// The service rejected the request with a 4xx status
    #[error("Client error {status}: {body}")]
    ClientError { status: u16, body: String },

    /// The service answered with a 5xx status
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) | Self::ServerError { .. } => true,
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LLMError::RateLimitExceeded("slow down".into()).is_retryable());
        assert!(
            LLMError::ServerError {
                status: 503,
                body: "busy".into()
            }
            .is_retryable()
        );
        assert!(!LLMError::AuthenticationFailed.is_retryable());
        assert!(!LLMError::InvalidRequest("bad".into()).is_retryable());
        assert!(!LLMError::ModelNotFound("gpt-x".into()).is_retryable());
        assert!(
            !LLMError::ClientError {
                status: 403,
                body: "forbidden".into()
            }
            .is_retryable()
        );
        assert!(!LLMError::UnexpectedResponse("HTTP 302".into()).is_retryable());
    }
}
