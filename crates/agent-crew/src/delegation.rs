//! Delegation tools
//!
//! A manager (or a worker allowed to delegate) hands work to coworkers
//! through two tools: one delegates a piece of work, the other asks a
//! question. Both name the coworker by role; matching ignores case and
//! surrounding whitespace. Delegated work runs with the coworker's own
//! tools only, so delegation never recurses.

use crate::agent::{CrewAgent, TOKEN_USAGE_KEY};
use crate::memory::{CrewMemory, DEFAULT_RECALL_LIMIT};
use crate::prompt;
use agent_core::{Agent, Context, Error, Result};
use agent_llm::TokenUsage;
use agent_tools::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Name of the work delegation tool
pub const DELEGATE_WORK_TOOL: &str = "delegate_work_to_coworker";
/// Name of the question tool
pub const ASK_QUESTION_TOOL: &str = "ask_question_to_coworker";

const DELEGATED_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

/// Shared token counter for delegated work
#[derive(Debug, Clone, Default)]
pub struct UsageMeter(Arc<Mutex<TokenUsage>>);

impl UsageMeter {
    /// Add usage
    pub fn add(&self, usage: TokenUsage) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += usage;
    }

    /// Take the accumulated usage, resetting the meter
    pub fn take(&self) -> TokenUsage {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Who can be delegated to, by whom, and on behalf of which task
pub struct DelegationScope {
    coworkers: Vec<Arc<CrewAgent>>,
    delegator: String,
    task: String,
    run_id: String,
    memory: Option<Arc<CrewMemory>>,
    usage: UsageMeter,
}

impl DelegationScope {
    /// Create a scope over the given coworkers
    pub fn new(coworkers: Vec<Arc<CrewAgent>>, delegator: impl Into<String>) -> Self {
        Self {
            coworkers,
            delegator: delegator.into(),
            task: String::new(),
            run_id: String::new(),
            memory: None,
            usage: UsageMeter::default(),
        }
    }

    /// Task on whose behalf work is delegated
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Run identifier passed to coworkers
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Memory shown to coworkers that have memory enabled
    pub fn with_memory(mut self, memory: Arc<CrewMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Meter that accumulates the coworkers' token usage
    pub fn with_usage_meter(mut self, usage: UsageMeter) -> Self {
        self.usage = usage;
        self
    }

    /// Roles of the available coworkers
    pub fn roles(&self) -> Vec<&str> {
        self.coworkers.iter().map(|c| c.role()).collect()
    }

    /// Both delegation tools bound to this scope
    pub fn tools(self) -> Vec<Arc<dyn Tool>> {
        let scope = Arc::new(self);
        vec![
            Arc::new(DelegateWorkTool::new(scope.clone())),
            Arc::new(AskQuestionTool::new(scope)),
        ]
    }

    /// Find a coworker by role, ignoring case and surrounding whitespace or quotes
    pub fn find(&self, coworker: &str) -> Result<&Arc<CrewAgent>> {
        let wanted = normalize_role(coworker);
        self.coworkers
            .iter()
            .find(|c| normalize_role(c.role()) == wanted)
            .ok_or_else(|| {
                Error::ProcessingFailed(format!(
                    "Coworker '{}' not found, please choose one of: {}",
                    coworker.trim(),
                    self.roles().join(", ")
                ))
            })
    }

    async fn dispatch(&self, coworker: &str, request: &str, context: &str) -> Result<Value> {
        let agent = self.find(coworker)?;

        let memories = match (&self.memory, agent.memory()) {
            (Some(memory), true) => memory.recent(&self.task, DEFAULT_RECALL_LIMIT),
            _ => Vec::new(),
        };
        let task_prompt =
            prompt::task_prompt(request, DELEGATED_EXPECTED_OUTPUT, Some(context), &memories);

        info!(
            delegator = %self.delegator,
            coworker = %agent.role(),
            task = %self.task,
            "Delegating to coworker"
        );

        let mut ctx = Context::new()
            .with_run_id(&self.run_id)
            .with_task(&self.task);
        ctx.set_delegated_by(&self.delegator);

        let answer = agent.process(task_prompt, &mut ctx).await?;
        if let Some(usage) = ctx.get_typed::<TokenUsage>(TOKEN_USAGE_KEY)? {
            self.usage.add(usage);
        }

        Ok(json!({ "coworker": agent.role(), "answer": answer }))
    }

    fn input_schema(&self, request_field: &str, request_description: &str) -> Value {
        json!({
            "type": "object",
            "properties": {
                request_field: {
                    "type": "string",
                    "description": request_description
                },
                "context": {
                    "type": "string",
                    "description": "Everything the coworker needs to know; they know nothing about the task"
                },
                "coworker": {
                    "type": "string",
                    "enum": self.roles(),
                    "description": "Role of the coworker"
                }
            },
            "required": [request_field, "context", "coworker"]
        })
    }
}

fn normalize_role(role: &str) -> String {
    role.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// Input for the work delegation tool
#[derive(Debug, Deserialize)]
struct DelegateWorkParams {
    task: String,
    #[serde(default)]
    context: String,
    coworker: String,
}

/// Input for the question tool
#[derive(Debug, Deserialize)]
struct AskQuestionParams {
    question: String,
    #[serde(default)]
    context: String,
    coworker: String,
}

/// Delegates a piece of work to a coworker
pub struct DelegateWorkTool {
    scope: Arc<DelegationScope>,
    description: String,
}

impl DelegateWorkTool {
    /// Create the tool for a scope
    pub fn new(scope: Arc<DelegationScope>) -> Self {
        let description = format!(
            "Delegate a specific task to one of the following coworkers: {}. \
             Provide the coworker, the task you want them to do, and ALL necessary context \
             to execute it. They know nothing about the task, so share everything you know \
             and explain things instead of referencing them.",
            scope.roles().join(", ")
        );
        Self { scope, description }
    }
}

#[async_trait]
impl Tool for DelegateWorkTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: DelegateWorkParams = serde_json::from_value(params)
            .map_err(|e| Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;
        self.scope
            .dispatch(&params.coworker, &params.task, &params.context)
            .await
    }

    fn name(&self) -> &str {
        DELEGATE_WORK_TOOL
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.scope
            .input_schema("task", "The task to delegate, described in full")
    }
}

/// Asks a coworker a question
pub struct AskQuestionTool {
    scope: Arc<DelegationScope>,
    description: String,
}

impl AskQuestionTool {
    /// Create the tool for a scope
    pub fn new(scope: Arc<DelegationScope>) -> Self {
        let description = format!(
            "Ask a specific question to one of the following coworkers: {}. \
             Provide the coworker, the question, and ALL necessary context to answer it. \
             They know nothing about the question, so share everything you know.",
            scope.roles().join(", ")
        );
        Self { scope, description }
    }
}

#[async_trait]
impl Tool for AskQuestionTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: AskQuestionParams = serde_json::from_value(params)
            .map_err(|e| Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;
        self.scope
            .dispatch(&params.coworker, &params.question, &params.context)
            .await
    }

    fn name(&self) -> &str {
        ASK_QUESTION_TOOL
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.scope.input_schema("question", "The question to ask")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Llm;
    use crate::executor::testing::ScriptedProvider;

    fn coworker(role: &str, provider: Arc<ScriptedProvider>, memory: bool) -> Arc<CrewAgent> {
        Arc::new(
            CrewAgent::builder(role)
                .goal("help")
                .llm(Llm::new(provider, "gpt-3.5-turbo"))
                .memory(memory)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_find_is_case_and_whitespace_insensitive() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let scope = DelegationScope::new(
            vec![
                coworker("Senior stock price Analyst", provider.clone(), false),
                coworker("Stock News Analyst", provider, false),
            ],
            "Crew Manager",
        );

        assert_eq!(
            scope.find("  senior STOCK price analyst ").unwrap().role(),
            "Senior stock price Analyst"
        );
        assert_eq!(scope.find("\"Stock News Analyst\"").unwrap().role(), "Stock News Analyst");

        let err = scope.find("Chief Economist").unwrap_err().to_string();
        assert!(err.contains("Chief Economist"));
        assert!(err.contains("Senior stock price Analyst, Stock News Analyst"));
    }

    #[tokio::test]
    async fn test_delegate_work_runs_coworker() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text(
            "BTC fear/greed 70",
        )]));
        let memory = Arc::new(CrewMemory::new());
        memory.save("Senior stock price Analyst", "get_stock_price", "AAPL price UP");

        let meter = UsageMeter::default();
        let tools = DelegationScope::new(
            vec![coworker("Stock News Analyst", provider.clone(), true)],
            "Crew Manager",
        )
        .with_task("get_news")
        .with_run_id("run-1")
        .with_memory(memory)
        .with_usage_meter(meter.clone())
        .tools();

        assert_eq!(tools[0].name(), DELEGATE_WORK_TOOL);
        assert_eq!(tools[1].name(), ASK_QUESTION_TOOL);
        assert!(tools[0].description().contains("Stock News Analyst"));

        let out = tools[0]
            .execute(json!({
                "task": "Summarise BTC news",
                "context": "The user researches AAPL",
                "coworker": "stock news analyst"
            }))
            .await
            .unwrap();

        assert_eq!(out["coworker"], "Stock News Analyst");
        assert_eq!(out["answer"], "BTC fear/greed 70");
        assert_eq!(meter.take().total(), 15);
        assert_eq!(meter.take().total(), 0);

        let request = &provider.requests()[0];
        let prompt = request.messages[0].text().unwrap();
        assert!(prompt.contains("Current Task: Summarise BTC news"));
        assert!(prompt.contains("The user researches AAPL"));
        assert!(prompt.contains("AAPL price UP"));
    }

    #[tokio::test]
    async fn test_invalid_input_and_unknown_coworker() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let tools = DelegationScope::new(
            vec![coworker("Stock News Analyst", provider.clone(), false)],
            "Crew Manager",
        )
        .tools();

        let err = tools[1].execute(json!({"question": "why?"})).await.unwrap_err();
        assert!(err.to_string().contains("Invalid parameters"));

        let err = tools[1]
            .execute(json!({"question": "why?", "context": "", "coworker": "Nobody"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(provider.requests().is_empty());
    }
}
