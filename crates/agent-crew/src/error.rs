//! Error types for crew orchestration

use agent_llm::LLMError;
use thiserror::Error;

/// Result type for crew operations
pub type Result<T> = std::result::Result<T, CrewError>;

/// Errors raised while building or running a crew
#[derive(Error, Debug)]
pub enum CrewError {
    /// The crew, an agent or a task is misconfigured
    #[error("Invalid crew configuration: {0}")]
    Configuration(String),

    /// A template placeholder could not be rendered
    #[error("Failed to render {field}: {message}")]
    Template { field: String, message: String },

    /// The LLM call failed (after retries, where retryable)
    #[error("LLM request failed: {0}")]
    Llm(#[from] LLMError),

    /// A task could not be completed
    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    /// Error surfaced from an agent or tool
    #[error(transparent)]
    Agent(#[from] agent_core::Error),
}

impl From<CrewError> for agent_core::Error {
    fn from(err: CrewError) -> Self {
        match err {
            CrewError::Agent(inner) => inner,
            CrewError::Configuration(msg) => agent_core::Error::Configuration(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_core_error() {
        let err: agent_core::Error = CrewError::Configuration("no agents".into()).into();
        assert!(matches!(err, agent_core::Error::Configuration(_)));

        let err: agent_core::Error = CrewError::Llm(LLMError::AuthenticationFailed).into();
        assert!(err.to_string().contains("authentication"));
    }
}
