//! Task definitions and outputs

use agent_llm::TokenUsage;
use serde::{Deserialize, Serialize};

/// A unit of work for the crew
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task name, used for context references
    pub name: String,
    /// What needs to be done (template)
    pub description: String,
    /// What the answer must look like (template)
    pub expected_output: String,
    /// Role of the agent assigned to the task
    pub agent: Option<String>,
    /// Names of earlier tasks whose outputs are passed in as context
    pub context: Option<Vec<String>>,
}

impl Task {
    /// Create a builder
    pub fn builder(name: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(name)
    }
}

/// Builder for Task
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            task: Task {
                name: name.into(),
                description: String::new(),
                expected_output: String::new(),
                agent: None,
                context: None,
            },
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.task.description = description.into();
        self
    }

    /// Set the expected output
    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.task.expected_output = expected_output.into();
        self
    }

    /// Assign the task to the agent with this role
    pub fn agent(mut self, role: impl Into<String>) -> Self {
        self.task.agent = Some(role.into());
        self
    }

    /// Use the outputs of these earlier tasks as context
    pub fn context<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task.context = Some(tasks.into_iter().map(Into::into).collect());
        self
    }

    /// Build the task
    pub fn build(self) -> Task {
        self.task
    }
}

/// Output of one completed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Task name
    pub name: String,
    /// Rendered task description
    pub description: String,
    /// Role of the agent that produced the answer
    pub agent: String,
    /// Raw answer text
    pub raw: String,
    /// Tokens spent on the task, delegated work included
    pub token_usage: TokenUsage,
}
