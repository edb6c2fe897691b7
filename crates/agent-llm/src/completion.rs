//! One round trip to a chat model: what goes out, what comes back

use crate::{Message, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Default completion budget when the caller does not set one
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// A chat completion call.
///
/// The whole conversation is resent on every call; providers are stateless.
/// Built with [`CompletionRequest::new`] and the `with_*` setters:
///
/// ```
/// use agent_llm::{CompletionRequest, Message};
///
/// let request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("Is AAPL up?")])
///     .with_system("You are a stock analyst")
///     .with_temperature(0.2);
/// assert_eq!(request.max_tokens, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Functions the model may call; `None` disables tool calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            tools: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offer tools to the model; an empty list leaves tool calling off
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = (!tools.is_empty()).then_some(tools);
        self
    }
}

/// What the model answered and why it stopped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    /// Truncated by `max_tokens`
    MaxTokens,
    /// The message carries tool calls waiting for results
    ToolUse,
}

/// Prompt and completion token counts; summed across calls with `+=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_setters() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("Analyze AAPL")])
            .with_system("You are a stock analyst")
            .with_max_tokens(2048)
            .with_temperature(0.7);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.system.as_deref(), Some("You are a stock analyst"));
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_empty_tool_list_disables_tools() {
        let request = CompletionRequest::new("m", Vec::new()).with_tools(Vec::new());
        assert!(request.tools.is_none());

        let request = CompletionRequest::new("m", Vec::new()).with_tools(vec![
            ToolDefinition::new("price", "Price history", json!({"type": "object"})),
        ]);
        assert_eq!(request.tools.map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage += TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        usage += TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        };
        assert_eq!(usage.input_tokens, 110);
        assert_eq!(usage.total(), 165);
    }
}
