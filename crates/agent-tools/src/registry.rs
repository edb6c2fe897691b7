//! Tool registry for managing available tools

use crate::Tool;
use agent_llm::ToolDefinition;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry for managing tools
///
/// Tools are keyed by name; registering a second tool with the same name
/// replaces the first. Listing order is alphabetical so that the tool list
/// sent to the model is stable between calls.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the given tools
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool, returning the tool it replaced (if any)
    pub fn register(&self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        tools.insert(tool.name().to_string(), tool)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.get(name).cloned()
    }

    /// List all registered tools
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.values().cloned().collect()
    }

    /// Names of all registered tools
    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.keys().cloned().collect()
    }

    /// Tool definitions to send to the LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_tools().iter().map(|tool| tool.definition()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Result;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        async fn execute(&self, params: Value) -> Result<Value> {
            Ok(json!({ "tool": self.0, "params": params }))
        }

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.register(Arc::new(Named("news"))).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("news").is_some());
        assert!(registry.get("prices").is_none());
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Named("news")));
        let replaced = registry.register(Arc::new(Named("news")));

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_sorted_by_name() {
        let registry = ToolRegistry::from_tools([
            Arc::new(Named("zeta")) as Arc<dyn Tool>,
            Arc::new(Named("alpha")) as Arc<dyn Tool>,
        ]);

        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_execute_through_registry() {
        let registry = ToolRegistry::from_tools([Arc::new(Named("echo")) as Arc<dyn Tool>]);
        let tool = registry.get("echo").unwrap();

        let out = tool.execute(json!({"x": 1})).await.unwrap();
        assert_eq!(out["tool"], "echo");
        assert_eq!(out["params"]["x"], 1);
    }
}
