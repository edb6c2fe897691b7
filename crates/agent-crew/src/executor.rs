//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the tool loop every crew agent runs:
//! 1. Call the LLM with the conversation history and available tools
//! 2. Check the stop reason
//! 3. If tool use was requested, execute the tools and loop back
//! 4. If completed, return the final answer
//!
//! When the iteration cap is reached the executor makes one last call
//! without tools, asking the model for its best final answer, so a capped
//! agent still produces output.

use crate::{CrewError, Result};
use agent_llm::tools::as_invalid_arguments;
use agent_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, StopReason,
    TokenUsage,
};
use agent_tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Prompt appended when an agent runs out of iterations
pub const FORCE_FINAL_ANSWER_PROMPT: &str = "You have run out of tool calls. Stop using tools \
and give your absolute best final answer to the task now, based on everything gathered so far.";

/// Event handler for agent execution events
///
/// Implement this trait to receive callbacks during agent execution.
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    /// Called when a tool execution starts
    async fn on_tool_start(&self, _id: &str, _name: &str, _input: &Value) {}

    /// Called when a tool execution completes
    async fn on_tool_done(
        &self,
        _id: &str,
        _name: &str,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }

    /// Called when the agent completes
    async fn on_complete(&self, _result: &str) {}

    /// Called when an error occurs
    async fn on_error(&self, _error: &str) {}
}

/// No-op event handler for when events are not needed
pub struct NoOpEventHandler;

#[async_trait]
impl ExecutorEventHandler for NoOpEventHandler {}

/// Event handler that narrates every step at `info`, used for verbose agents
pub struct TracingEventHandler {
    role: String,
}

impl TracingEventHandler {
    /// Create a handler that tags events with the agent role
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

#[async_trait]
impl ExecutorEventHandler for TracingEventHandler {
    async fn on_tool_start(&self, id: &str, name: &str, input: &Value) {
        info!(agent = %self.role, tool_id = %id, tool = %name, input = %input, "Using tool");
    }

    async fn on_tool_done(
        &self,
        _id: &str,
        name: &str,
        result: std::result::Result<&Value, &str>,
        duration_ms: u64,
    ) {
        match result {
            Ok(value) => {
                let preview: String = value.to_string().chars().take(300).collect();
                info!(agent = %self.role, tool = %name, duration_ms, output = %preview, "Tool output");
            }
            Err(error) => {
                warn!(agent = %self.role, tool = %name, duration_ms, error = %error, "Tool error");
            }
        }
    }

    async fn on_complete(&self, result: &str) {
        let preview: String = result.chars().take(300).collect();
        info!(agent = %self.role, final_answer = %preview, "Final answer");
    }

    async fn on_error(&self, error: &str) {
        warn!(agent = %self.role, error = %error, "Agent error");
    }
}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of tool-loop iterations before forcing a final answer
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,

    /// How many times a retryable LLM error is retried
    pub max_retry_limit: u32,

    /// Base delay for exponential backoff between retries
    pub retry_base_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: None,
            max_tokens: 2048,
            temperature: Some(0.7),
            max_retry_limit: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl ExecutorConfig {
    /// Backoff before retry number `attempt` (0-based): base * 2^attempt
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Result of one executor run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Final answer text
    pub text: String,

    /// Tokens used across every call of the run
    pub usage: TokenUsage,

    /// Number of LLM calls made, including a forced final answer
    pub iterations: usize,

    /// Whether the iteration cap forced the final answer
    pub forced_final_answer: bool,
}

/// Executes an agent loop: LLM → tool calls → execution → loop back
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
            event_handler: None,
        }
    }

    /// Create a builder
    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    /// Set the event handler for receiving execution events
    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute the agent loop for a single user message
    pub async fn run(&self, user_message: impl Into<String>) -> Result<ExecutionOutput> {
        let result = self.run_loop(vec![Message::user(user_message)]).await;

        if let (Err(e), Some(handler)) = (&result, &self.event_handler) {
            handler.on_error(&e.to_string()).await;
        }
        result
    }

    async fn run_loop(&self, mut conversation: Vec<Message>) -> Result<ExecutionOutput> {
        let tools = self.tool_registry.definitions();
        let mut usage = TokenUsage::default();
        let mut calls = 0;

        for iteration in 1..=self.config.max_iterations {
            info!(
                iteration = iteration,
                max_iterations = self.config.max_iterations,
                "Agent iteration started"
            );

            if let Some(last_msg) = conversation.last() {
                let msg_preview: String = last_msg.text().unwrap_or("").chars().take(200).collect();
                debug!(role = ?last_msg.role, message_preview = %msg_preview, "Processing message");
            }

            let request = self.request(conversation.clone()).with_tools(tools.clone());
            let response = self.complete_with_retry(request).await?;
            calls += 1;
            usage += response.usage;

            let response_preview: String =
                response.message.text().unwrap_or("").chars().take(300).collect();
            debug!(response_preview = %response_preview, "LLM response content preview");

            match response.stop_reason {
                StopReason::ToolUse if response.message.has_tool_uses() => {
                    let tool_results = self.execute_tools(&response.message).await;
                    info!(
                        result_count = tool_results.len(),
                        "Tool execution completed, continuing agent loop"
                    );
                    conversation.push(response.message);
                    conversation.extend(tool_results);
                }
                StopReason::MaxTokens => {
                    warn!("Hit max tokens in LLM response, returning truncated answer");
                    return self.finish(&response, usage, calls, false).await;
                }
                _ => {
                    info!(iteration = iteration, "Agent completed naturally");
                    return self.finish(&response, usage, calls, false).await;
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached, forcing final answer"
        );
        conversation.push(Message::user(FORCE_FINAL_ANSWER_PROMPT));

        let response = self
            .complete_with_retry(self.request(conversation))
            .await?;
        calls += 1;
        usage += response.usage;

        self.finish(&response, usage, calls, true).await
    }

    fn request(&self, conversation: Vec<Message>) -> CompletionRequest {
        let mut request = CompletionRequest::new(&self.config.model, conversation)
            .with_system(
                self.config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| "You are a helpful assistant.".to_string()),
            )
            .with_max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }

    async fn finish(
        &self,
        response: &CompletionResponse,
        usage: TokenUsage,
        iterations: usize,
        forced_final_answer: bool,
    ) -> Result<ExecutionOutput> {
        let text = response.message.text().unwrap_or("").trim().to_string();

        if let Some(handler) = &self.event_handler {
            handler.on_complete(&text).await;
        }

        Ok(ExecutionOutput {
            text,
            usage,
            iterations,
            forced_final_answer,
        })
    }

    /// Call the provider, retrying retryable errors with exponential backoff
    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut attempt = 0;
        loop {
            info!(
                model = %self.config.model,
                attempt = attempt,
                tool_count = request.tools.as_ref().map_or(0, Vec::len),
                "Sending request to LLM"
            );

            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    info!(
                        stop_reason = ?response.stop_reason,
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "LLM response received"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retry_limit => {
                    let delay = self.config.retry_backoff(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable LLM error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(CrewError::Llm(e)),
            }
        }
    }

    /// Execute tool calls from an assistant message
    ///
    /// Unknown tools and tool failures become error tool results.
    async fn execute_tools(&self, message: &Message) -> Vec<Message> {
        let mut results = Vec::new();

        for tool_use in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = tool_use else {
                continue;
            };

            let input_preview: String = input.to_string().chars().take(500).collect();
            info!(tool_name = %name, tool_id = %id, input_preview = %input_preview, "Executing tool");

            if let Some(handler) = &self.event_handler {
                handler.on_tool_start(id, name, input).await;
            }

            let start_time = Instant::now();
            let outcome = if let Some((raw, error)) = as_invalid_arguments(input) {
                Err(format!(
                    "Arguments for tool '{name}' are not valid JSON ({error}): {raw}. \
                     Call the tool again with a JSON object matching its schema."
                ))
            } else {
                match self.tool_registry.get(name) {
                    Some(tool) => tool.execute(input.clone()).await.map_err(|e| e.to_string()),
                    None => Err(format!(
                        "Tool '{}' does not exist. Available tools: {}",
                        name,
                        self.tool_registry.names().join(", ")
                    )),
                }
            };
            let duration_ms = start_time.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    let result_str =
                        serde_json::to_string(&result).unwrap_or_else(|_| result.to_string());
                    info!(
                        tool_name = %name,
                        duration_ms = duration_ms,
                        result_length = result_str.len(),
                        "Tool execution succeeded"
                    );

                    if let Some(handler) = &self.event_handler {
                        handler.on_tool_done(id, name, Ok(&result), duration_ms).await;
                    }

                    results.push(Message::tool_result(id.clone(), result_str));
                }
                Err(error) => {
                    warn!(
                        tool_name = %name,
                        duration_ms = duration_ms,
                        error = %error,
                        "Tool execution failed"
                    );

                    if let Some(handler) = &self.event_handler {
                        handler
                            .on_tool_done(id, name, Err(error.as_str()), duration_ms)
                            .await;
                    }

                    results.push(Message::tool_error(id.clone(), format!("Error: {error}")));
                }
            }
        }

        results
    }
}

/// Builder for AgentExecutor
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentExecutorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            config: ExecutorConfig::default(),
            event_handler: None,
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set the retry policy for retryable LLM errors
    pub fn retry(mut self, max_retry_limit: u32, base_delay: Duration) -> Self {
        self.config.max_retry_limit = max_retry_limit;
        self.config.retry_base_delay = base_delay;
        self
    }

    /// Set the event handler
    pub fn event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| CrewError::Configuration("Provider not set".to_string()))?;

        Ok(AgentExecutor {
            provider,
            tool_registry: self.tool_registry,
            config: self.config,
            event_handler: self.event_handler,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider shared by the crate's tests

    use agent_llm::{
        CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason,
        TokenUsage,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One scripted provider reply
    pub enum Reply {
        Text(String),
        Tools(Vec<(String, Value)>),
        Fail(LLMError),
    }

    /// Provider that replays scripted replies and records every request
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn text(text: &str) -> Reply {
            Reply::Text(text.to_string())
        }

        pub fn tool(name: &str, input: Value) -> Reply {
            Reply::Tools(vec![(name.to_string(), input)])
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            let n = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request);
                requests.len()
            };
            let usage = TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            };

            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::Text("out of script".to_string()));

            match reply {
                Reply::Text(text) => Ok(CompletionResponse {
                    message: Message::assistant(text),
                    stop_reason: StopReason::EndTurn,
                    usage,
                }),
                Reply::Tools(calls) => Ok(CompletionResponse {
                    message: Message::assistant_tool_calls(
                        calls
                            .into_iter()
                            .enumerate()
                            .map(|(i, (name, input))| (format!("call_{n}_{i}"), name, input))
                            .collect(),
                    ),
                    stop_reason: StopReason::ToolUse,
                    usage,
                }),
                Reply::Fail(e) => Err(e),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
