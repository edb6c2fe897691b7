//! Core abstractions for stock-crew
//!
//! This crate defines the fundamental traits and types shared by the crew
//! orchestration layer and the domain crates built on top of it.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::Context;
pub use error::{Error, Result};
