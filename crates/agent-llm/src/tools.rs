//! Function declarations offered to the model, and the marker for calls
//! whose arguments could not be decoded

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Input key flagging a tool call whose argument string was not valid JSON.
///
/// Providers put the raw argument text under this key and the decode error
/// under `"error"`; the tool itself never sees such a call.
pub const INVALID_ARGUMENTS_KEY: &str = "__invalid_arguments";

/// A function the model may call, described by a JSON Schema for its input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Registry name, `^[a-zA-Z0-9_-]+$`
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool input standing in for arguments that failed to decode
pub fn invalid_arguments(raw: &str, error: &str) -> Value {
    json!({ INVALID_ARGUMENTS_KEY: raw, "error": error })
}

/// Raw text and decode error when `input` came from [`invalid_arguments`]
pub fn as_invalid_arguments(input: &Value) -> Option<(&str, &str)> {
    let raw = input.get(INVALID_ARGUMENTS_KEY)?.as_str()?;
    let error = input.get("error").and_then(Value::as_str).unwrap_or("invalid JSON");
    Some((raw, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_creation() {
        let schema = json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"],
        });

        let tool = ToolDefinition::new("duckduckgo_news_search", "Search news", schema.clone());
        assert_eq!(tool.name, "duckduckgo_news_search");
        assert_eq!(tool.input_schema, schema);
    }

    #[test]
    fn test_invalid_arguments_marker() {
        let input = invalid_arguments("{\"ticket\": \"AAPL\"", "EOF while parsing");
        assert_eq!(
            as_invalid_arguments(&input),
            Some(("{\"ticket\": \"AAPL\"", "EOF while parsing"))
        );

        assert_eq!(as_invalid_arguments(&json!({"ticket": "AAPL"})), None);
        assert_eq!(as_invalid_arguments(&json!("plain")), None);
    }
}
