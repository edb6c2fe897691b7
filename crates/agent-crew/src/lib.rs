//! Crew orchestration for stock-crew
//!
//! A crew is a set of role-based agents plus an ordered list of tasks. The
//! crew runs its tasks either sequentially, each by its assigned agent, or
//! hierarchically, where a manager agent delegates the work to coworkers
//! through delegation tools.
//!
//! # Example
//!
//! ```no_run
//! use agent_crew::{Crew, CrewAgent, Llm, Process, Task};
//! use std::collections::HashMap;
//! # use std::sync::Arc;
//!
//! # async fn example(provider: Arc<dyn agent_llm::LLMProvider>) -> Result<(), agent_crew::CrewError> {
//! let llm = Llm::new(provider, "gpt-3.5-turbo");
//!
//! let analyst = CrewAgent::builder("Analyst")
//!     .goal("Analyse {{ ticket }}")
//!     .backstory("You read charts for a living.")
//!     .llm(llm.clone())
//!     .build()?;
//!
//! let crew = Crew::builder()
//!     .agent(analyst)
//!     .task(
//!         Task::builder("analyse")
//!             .description("Analyse the {{ ticket }} price")
//!             .expected_output("A one line trend")
//!             .agent("Analyst")
//!             .build(),
//!     )
//!     .process(Process::Sequential)
//!     .build()?;
//!
//! let inputs = HashMap::from([("ticket".to_string(), "AAPL".to_string())]);
//! let output = crew.kickoff(&inputs).await?;
//! println!("{}", output.final_output);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod crew;
pub mod delegation;
pub mod error;
pub mod executor;
pub mod memory;
pub mod prompt;
pub mod task;
pub mod template;

pub use agent::{CrewAgent, CrewAgentBuilder, Llm};
pub use crew::{Crew, CrewBuilder, CrewOutput, MANAGER_ROLE, Process};
pub use delegation::{AskQuestionTool, DelegateWorkTool, DelegationScope, UsageMeter};
pub use error::{CrewError, Result};
pub use executor::{
    AgentExecutor, ExecutionOutput, ExecutorConfig, ExecutorEventHandler, NoOpEventHandler,
    TracingEventHandler,
};
pub use memory::{CrewMemory, MemoryEntry};
pub use task::{Task, TaskBuilder, TaskOutput};
