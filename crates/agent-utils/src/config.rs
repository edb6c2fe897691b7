//! Environment configuration helpers

use std::str::FromStr;
use thiserror::Error;

/// Error raised when an environment variable holds an unusable value
#[derive(Debug, Error)]
#[error("invalid value for {key}: '{value}' ({reason})")]
pub struct ConfigError {
    /// Variable name
    pub key: String,
    /// Raw value found
    pub value: String,
    /// Parser message
    pub reason: String,
}

/// Read a variable, falling back to `default` when unset or blank
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// Read and parse an optional variable
///
/// Unset or blank variables yield `Ok(None)`; present but malformed values
/// are an error rather than being silently replaced by a default.
pub fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim().parse::<T>().map(Some).map_err(|e| ConfigError {
                key: key.to_string(),
                value: v.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(None),
    }
}
