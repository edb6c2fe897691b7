//! Tool management and execution framework for stock-crew
//!
//! This crate provides a framework for defining and executing tools (functions)
//! that agents can call during their reasoning loop.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
