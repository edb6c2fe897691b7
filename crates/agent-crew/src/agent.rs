//! Role-based crew agents

use crate::executor::{AgentExecutor, ExecutionOutput, ExecutorConfig, ExecutorEventHandler, TracingEventHandler};
use crate::prompt;
use crate::template::Interpolator;
use crate::{CrewError, Result};
use agent_core::{Agent, Context};
use agent_llm::LLMProvider;
use agent_tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Context key under which [`CrewAgent`] records the token usage of a call
pub const TOKEN_USAGE_KEY: &str = "token_usage";

/// An LLM binding: provider plus model settings
#[derive(Clone)]
pub struct Llm {
    /// Provider used for completions
    pub provider: Arc<dyn LLMProvider>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Max tokens per completion
    pub max_tokens: usize,
}

impl Llm {
    /// Bind a provider to a model
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: Some(0.7),
            max_tokens: 2048,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens per completion
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl fmt::Debug for Llm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Llm")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// An agent defined by a role, a goal and a backstory
///
/// Each call to [`CrewAgent::execute`] runs a fresh tool loop with the
/// agent's own tools plus any extra tools the crew hands in (delegation).
#[derive(Clone)]
pub struct CrewAgent {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Arc<dyn Tool>>,
    llm: Llm,
    max_iter: usize,
    max_retry_limit: u32,
    retry_base_delay: Duration,
    memory: bool,
    allow_delegation: bool,
    verbose: bool,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl CrewAgent {
    /// Create a builder
    pub fn builder(role: impl Into<String>) -> CrewAgentBuilder {
        CrewAgentBuilder::new(role)
    }

    /// The agent's role (its identity within the crew)
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The agent's goal
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// The agent's backstory
    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    /// Tools owned by the agent
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// LLM binding
    pub fn llm(&self) -> &Llm {
        &self.llm
    }

    /// Iteration cap of the tool loop
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Whether the agent sees short-term memory
    pub fn memory(&self) -> bool {
        self.memory
    }

    /// Whether the agent may delegate to coworkers
    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    /// Whether every step is logged at `info`
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Attach an event handler, replacing the verbose tracing handler
    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Copy of the agent with role, goal and backstory rendered
    pub fn interpolated(&self, interpolator: &Interpolator<'_>) -> Result<Self> {
        let mut agent = self.clone();
        agent.role = interpolator.render(&format!("role of '{}'", self.role), &self.role)?;
        agent.goal = interpolator.render(&format!("goal of '{}'", self.role), &self.goal)?;
        agent.backstory =
            interpolator.render(&format!("backstory of '{}'", self.role), &self.backstory)?;
        Ok(agent)
    }

    /// System prompt built from the persona
    pub fn system_prompt(&self) -> String {
        prompt::system_prompt(&self.role, &self.goal, &self.backstory)
    }

    /// Run the tool loop on a task prompt
    pub async fn execute(
        &self,
        task_prompt: impl Into<String>,
        extra_tools: Vec<Arc<dyn Tool>>,
    ) -> Result<ExecutionOutput> {
        let registry = ToolRegistry::from_tools(self.tools.iter().cloned().chain(extra_tools));

        let config = ExecutorConfig {
            max_iterations: self.max_iter,
            model: self.llm.model.clone(),
            system_prompt: Some(self.system_prompt()),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            max_retry_limit: self.max_retry_limit,
            retry_base_delay: self.retry_base_delay,
        };

        let mut executor =
            AgentExecutor::new(self.llm.provider.clone(), Arc::new(registry), config);
        if let Some(handler) = &self.event_handler {
            executor = executor.with_event_handler(handler.clone());
        } else if self.verbose {
            executor = executor.with_event_handler(Arc::new(TracingEventHandler::new(&self.role)));
        }

        executor.run(task_prompt).await
    }
}

impl fmt::Debug for CrewAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrewAgent")
            .field("role", &self.role)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("llm", &self.llm)
            .field("max_iter", &self.max_iter)
            .field("memory", &self.memory)
            .field("allow_delegation", &self.allow_delegation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for CrewAgent {
    /// Runs `input` as a task prompt with the agent's own tools and records
    /// the token usage under [`TOKEN_USAGE_KEY`].
    async fn process(&self, input: String, context: &mut Context) -> agent_core::Result<String> {
        tracing::debug!(
            agent = %self.role,
            run_id = context.run_id().unwrap_or("-"),
            task = context.task().unwrap_or("-"),
            delegated_by = context.delegated_by().unwrap_or("-"),
            "Agent processing input"
        );

        let output = self.execute(input, Vec::new()).await?;
        context.insert_typed(TOKEN_USAGE_KEY, &output.usage)?;
        Ok(output.text)
    }

    fn name(&self) -> &str {
        &self.role
    }
}

/// Builder for CrewAgent
pub struct CrewAgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Arc<dyn Tool>>,
    llm: Option<Llm>,
    max_iter: usize,
    max_retry_limit: u32,
    retry_base_delay: Duration,
    memory: bool,
    allow_delegation: bool,
    verbose: bool,
}

impl CrewAgentBuilder {
    /// Create a new builder
    pub fn new(role: impl Into<String>) -> Self {
        let defaults = ExecutorConfig::default();
        Self {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            tools: Vec::new(),
            llm: None,
            max_iter: defaults.max_iterations,
            max_retry_limit: defaults.max_retry_limit,
            retry_base_delay: defaults.retry_base_delay,
            memory: false,
            allow_delegation: false,
            verbose: false,
        }
    }

    /// Set the goal
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Set the backstory
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set the LLM binding
    pub fn llm(mut self, llm: Llm) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the iteration cap
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the retry policy for retryable LLM errors
    pub fn retry(mut self, max_retry_limit: u32, base_delay: Duration) -> Self {
        self.max_retry_limit = max_retry_limit;
        self.retry_base_delay = base_delay;
        self
    }

    /// Enable short-term memory
    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    /// Allow delegation to coworkers
    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Log every step at `info`
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<CrewAgent> {
        if self.role.trim().is_empty() {
            return Err(CrewError::Configuration("Agent role must not be empty".to_string()));
        }
        let llm = self.llm.ok_or_else(|| {
            CrewError::Configuration(format!("Agent '{}' has no LLM", self.role))
        })?;
        if self.max_iter == 0 {
            return Err(CrewError::Configuration(format!(
                "Agent '{}' needs max_iter of at least 1",
                self.role
            )));
        }

        Ok(CrewAgent {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            tools: self.tools,
            llm,
            max_iter: self.max_iter,
            max_retry_limit: self.max_retry_limit,
            retry_base_delay: self.retry_base_delay,
            memory: self.memory,
            allow_delegation: self.allow_delegation,
            verbose: self.verbose,
            event_handler: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedProvider;
    use agent_llm::TokenUsage;
    use std::collections::HashMap;

    fn llm(provider: Arc<ScriptedProvider>) -> Llm {
        Llm::new(provider, "gpt-3.5-turbo")
    }

    #[test]
    fn test_builder_validation() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));

        assert!(CrewAgent::builder("  ").llm(llm(provider.clone())).build().is_err());
        assert!(CrewAgent::builder("Analyst").build().is_err());
        assert!(
            CrewAgent::builder("Analyst")
                .llm(llm(provider.clone()))
                .max_iter(0)
                .build()
                .is_err()
        );

        let agent = CrewAgent::builder("Analyst")
            .llm(llm(provider))
            .max_iter(5)
            .memory(true)
            .build()
            .unwrap();
        assert_eq!(agent.max_iter(), 5);
        assert!(agent.memory());
        assert!(!agent.allow_delegation());
    }

    #[test]
    fn test_interpolated_persona() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let agent = CrewAgent::builder("Senior stock price Analyst")
            .goal("Find the {{ ticket }} stock price and analyses trends")
            .backstory("Tracks {{ ticket }} daily.")
            .llm(llm(provider))
            .build()
            .unwrap();

        let inputs = HashMap::from([("ticket".to_string(), "TSLA".to_string())]);
        let rendered = agent.interpolated(&Interpolator::new(&inputs)).unwrap();
        assert_eq!(rendered.goal(), "Find the TSLA stock price and analyses trends");
        assert!(rendered.system_prompt().contains("Tracks TSLA daily."));

        let missing = agent.interpolated(&Interpolator::new(&HashMap::new()));
        assert!(matches!(missing, Err(CrewError::Template { .. })));
    }

    #[tokio::test]
    async fn test_process_records_usage() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text("done")]));
        let agent = CrewAgent::builder("Analyst")
            .goal("Analyse")
            .llm(llm(provider.clone()))
            .build()
            .unwrap();

        let mut context = Context::new().with_task("get_stock_price");
        let answer = agent.process("Analyse AAPL".to_string(), &mut context).await.unwrap();

        assert_eq!(answer, "done");
        assert_eq!(agent.name(), "Analyst");
        let usage: TokenUsage = context.get_typed(TOKEN_USAGE_KEY).unwrap().unwrap();
        assert_eq!(usage.total(), 15);

        let request = &provider.requests()[0];
        assert!(request.system.as_deref().unwrap().starts_with("You are Analyst."));
        assert!(request.tools.is_none());
    }
}
