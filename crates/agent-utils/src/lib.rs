//! Shared utilities for stock-crew
//!
//! Logging setup and helpers for reading configuration from the environment.

pub mod config;
pub mod logging;

pub use config::{ConfigError, env_or, env_parse};
pub use logging::{LogFormat, init_tracing, init_tracing_with_format};
