//! Execution context for agents
//!
//! The `Context` struct is a key-value store carrying run-scoped state into
//! agents: the crew run id, the task being worked on and the kickoff inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known context keys
pub mod keys {
    /// Identifier of the crew run (one per kickoff)
    pub const RUN_ID: &str = "run_id";
    /// Name of the task currently being executed
    pub const TASK: &str = "task";
    /// Kickoff inputs (object of string values)
    pub const INPUTS: &str = "inputs";
    /// Role of the agent that delegated the current piece of work
    pub const DELEGATED_BY: &str = "delegated_by";
}

/// Context passed to agents during execution
///
/// # Example
///
/// ```
/// use agent_core::Context;
///
/// let ctx = Context::new()
///     .with_run_id("run-1")
///     .with_task("get_stock_price");
///
/// assert_eq!(ctx.run_id(), Some("run-1"));
/// assert_eq!(ctx.task(), Some("get_stock_price"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    // =========== Builder Methods ===========

    /// Set the run id
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.insert(keys::RUN_ID, serde_json::json!(run_id.into()));
        self
    }

    /// Set the current task name
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.set_task(task);
        self
    }

    /// Set the kickoff inputs
    pub fn with_inputs(mut self, inputs: &HashMap<String, String>) -> Self {
        self.insert(keys::INPUTS, serde_json::json!(inputs));
        self
    }

    // =========== Common Accessors ===========

    /// Get the run id
    pub fn run_id(&self) -> Option<&str> {
        self.get(keys::RUN_ID).and_then(|v| v.as_str())
    }

    /// Get the current task name
    pub fn task(&self) -> Option<&str> {
        self.get(keys::TASK).and_then(|v| v.as_str())
    }

    /// Set the current task name
    pub fn set_task(&mut self, task: impl Into<String>) {
        self.insert(keys::TASK, serde_json::json!(task.into()));
    }

    /// Get a single kickoff input by name
    pub fn input(&self, name: &str) -> Option<&str> {
        self.get(keys::INPUTS)
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
    }

    /// Role of the delegating agent, if this work was delegated
    pub fn delegated_by(&self) -> Option<&str> {
        self.get(keys::DELEGATED_BY).and_then(|v| v.as_str())
    }

    /// Mark the context as delegated by the given role
    pub fn set_delegated_by(&mut self, role: impl Into<String>) {
        self.insert(keys::DELEGATED_BY, serde_json::json!(role.into()));
    }

    // =========== Generic Key-Value Operations ===========

    /// Insert a value into the context
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value from the context
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Insert a typed value into the context
    ///
    /// Serializes the value to JSON before storing.
    pub fn insert_typed<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> crate::Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            crate::Error::ProcessingFailed(format!("Failed to serialize context value: {e}"))
        })?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Get a typed value from the context
    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> crate::Result<Option<T>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => {
                let typed = serde_json::from_value(value.clone()).map_err(|e| {
                    crate::Error::ProcessingFailed(format!(
                        "Failed to deserialize context value: {e}"
                    ))
                })?;
                Ok(Some(typed))
            }
        }
    }

    /// Check if a key exists in the context
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Remove a value from the context
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Get the number of entries in the context
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the context is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Merge another context into this one (other values override)
    pub fn merge(&mut self, other: Context) {
        self.data.extend(other.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Usage {
        prompt: usize,
        completion: usize,
    }

    #[test]
    fn test_basic_operations() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        ctx.insert("key", serde_json::json!("value"));
        assert_eq!(ctx.len(), 1);
        assert!(ctx.contains_key("key"));

        ctx.remove("key");
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_typed_insert_get() {
        let mut ctx = Context::new();
        let usage = Usage {
            prompt: 12,
            completion: 30,
        };

        ctx.insert_typed("usage", &usage).unwrap();

        let retrieved: Usage = ctx.get_typed("usage").unwrap().unwrap();
        assert_eq!(retrieved, usage);
    }

    #[test]
    fn test_inputs_lookup() {
        let inputs = HashMap::from([("ticket".to_string(), "AAPL".to_string())]);
        let ctx = Context::new().with_inputs(&inputs);

        assert_eq!(ctx.input("ticket"), Some("AAPL"));
        assert_eq!(ctx.input("missing"), None);
    }

    #[test]
    fn test_task_and_delegation() {
        let mut ctx = Context::new().with_run_id("run-7").with_task("write");
        assert_eq!(ctx.run_id(), Some("run-7"));
        assert_eq!(ctx.task(), Some("write"));
        assert_eq!(ctx.delegated_by(), None);

        ctx.set_delegated_by("Crew Manager");
        assert_eq!(ctx.delegated_by(), Some("Crew Manager"));
    }

    #[test]
    fn test_merge() {
        let mut ctx1 = Context::new().with_task("a");
        let ctx2 = Context::new().with_task("b").with_run_id("run");

        ctx1.merge(ctx2);
        assert_eq!(ctx1.task(), Some("b"));
        assert_eq!(ctx1.run_id(), Some("run"));
    }

    #[test]
    fn test_get_typed_missing_key() {
        let ctx = Context::new();
        let result: crate::Result<Option<Usage>> = ctx.get_typed("missing");
        assert!(result.unwrap().is_none());
    }
}
