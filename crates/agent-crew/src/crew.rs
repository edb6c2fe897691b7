//! Crew: agents, tasks and the process that runs them

use crate::agent::{CrewAgent, Llm};
use crate::delegation::{DelegationScope, UsageMeter};
use crate::executor::ExecutorEventHandler;
use crate::memory::{CrewMemory, DEFAULT_RECALL_LIMIT};
use crate::prompt;
use crate::task::{Task, TaskOutput};
use crate::template::Interpolator;
use crate::{CrewError, Result};
use agent_llm::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Role of the manager agent in hierarchical crews
pub const MANAGER_ROLE: &str = "Crew Manager";

const MANAGER_GOAL: &str = "Manage the team to complete the task in the best way possible.";

const MANAGER_BACKSTORY: &str = "You are a seasoned manager with a knack for getting the best \
out of your team. You are known for your ability to delegate work to the right people and to \
ask the right questions to get the best out of them. Even though you don't perform tasks by \
yourself, you have a lot of experience in the field, which allows you to properly evaluate the \
work of your team members.";

/// How tasks are assigned and executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Tasks run in order, each by its assigned agent
    #[default]
    Sequential,
    /// A manager agent runs every task by delegating to the crew
    Hierarchical,
}

/// Result of a crew run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Identifier of the run
    pub run_id: String,
    /// Raw output of the last task
    pub final_output: String,
    /// Outputs of every task, in execution order
    pub tasks_output: Vec<TaskOutput>,
    /// Tokens used by the whole run
    pub token_usage: TokenUsage,
}

/// A validated crew, ready to be kicked off any number of times
///
/// Every kickoff gets a fresh run id and a fresh short-term memory.
pub struct Crew {
    agents: Vec<CrewAgent>,
    tasks: Vec<Task>,
    assignments: Vec<Option<usize>>,
    process: Process,
    manager_llm: Option<Llm>,
    max_iter: usize,
    verbose: bool,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl Crew {
    /// Create a builder
    pub fn builder() -> CrewBuilder {
        CrewBuilder::new()
    }

    /// The crew's agents
    pub fn agents(&self) -> &[CrewAgent] {
        &self.agents
    }

    /// The crew's tasks, in execution order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The process
    pub fn process(&self) -> Process {
        self.process
    }

    /// Run every task with the given inputs
    ///
    /// All templates are rendered before the first LLM call, so a missing
    /// input fails fast.
    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> Result<CrewOutput> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("crew", run_id = %run_id, process = ?self.process);

        self.run(run_id, inputs).instrument(span).await
    }

    async fn run(&self, run_id: String, inputs: &HashMap<String, String>) -> Result<CrewOutput> {
        let interpolator = Interpolator::new(inputs);
        let agents = self
            .agents
            .iter()
            .map(|agent| -> Result<Arc<CrewAgent>> {
                Ok(Arc::new(self.attach_handler(agent.interpolated(&interpolator)?)))
            })
            .collect::<Result<Vec<_>>>()?;
        let tasks = self
            .tasks
            .iter()
            .map(|task| render_task(task, &interpolator))
            .collect::<Result<Vec<_>>>()?;
        let manager = match self.process {
            Process::Hierarchical => Some(Arc::new(self.attach_handler(self.manager_agent()?))),
            Process::Sequential => None,
        };

        info!(
            agents = agents.len(),
            tasks = tasks.len(),
            "Crew kickoff started"
        );

        let memory = Arc::new(CrewMemory::new());
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(tasks.len());

        for (index, task) in tasks.iter().enumerate() {
            let context = task_context(task, &outputs);
            let run = TaskRun {
                task,
                context: context.as_deref(),
                agents: &agents,
                memory: &memory,
                run_id: &run_id,
            };

            let assignment = self.assignments[index];
            let result = async {
                match &manager {
                    Some(manager) => run.hierarchical(manager, assignment).await,
                    None => run.sequential(assignment).await,
                }
            }
            .instrument(info_span!("task", task = %task.name))
            .await;
            let output = result.map_err(|e| CrewError::TaskFailed {
                task: task.name.clone(),
                message: e.to_string(),
            })?;

            info!(
                task = %task.name,
                agent = %output.agent,
                output_length = output.raw.len(),
                tokens = output.token_usage.total(),
                "Task completed"
            );
            memory.save(&output.agent, &task.name, &output.raw);
            outputs.push(output);
        }

        let mut token_usage = TokenUsage::default();
        for output in &outputs {
            token_usage += output.token_usage;
        }
        let final_output = outputs.last().map(|o| o.raw.clone()).unwrap_or_default();

        info!(total_tokens = token_usage.total(), "Crew kickoff finished");

        Ok(CrewOutput {
            run_id,
            final_output,
            tasks_output: outputs,
            token_usage,
        })
    }

    fn attach_handler(&self, agent: CrewAgent) -> CrewAgent {
        match &self.event_handler {
            Some(handler) => agent.with_event_handler(handler.clone()),
            None => agent,
        }
    }

    fn manager_agent(&self) -> Result<CrewAgent> {
        let llm = self.manager_llm.clone().ok_or_else(|| {
            CrewError::Configuration("Hierarchical process requires a manager LLM".to_string())
        })?;

        CrewAgent::builder(MANAGER_ROLE)
            .goal(MANAGER_GOAL)
            .backstory(MANAGER_BACKSTORY)
            .llm(llm)
            .max_iter(self.max_iter)
            .memory(self.agents.iter().any(CrewAgent::memory))
            .verbose(self.verbose)
            .build()
    }
}

/// Everything one task execution needs
struct TaskRun<'a> {
    task: &'a Task,
    context: Option<&'a str>,
    agents: &'a [Arc<CrewAgent>],
    memory: &'a Arc<CrewMemory>,
    run_id: &'a str,
}

impl TaskRun<'_> {
    async fn sequential(&self, assignment: Option<usize>) -> Result<TaskOutput> {
        let index = assignment.ok_or_else(|| {
            CrewError::Configuration(format!("Task '{}' has no agent", self.task.name))
        })?;
        let agent = &self.agents[index];

        let meter = UsageMeter::default();
        let delegation_tools = if agent.allow_delegation() {
            let coworkers: Vec<_> = self
                .agents
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, a)| a.clone())
                .collect();
            if coworkers.is_empty() {
                Vec::new()
            } else {
                self.scope(coworkers, agent.role(), &meter).tools()
            }
        } else {
            Vec::new()
        };

        let prompt = self.prompt(agent, &self.task.description);
        let output = agent.execute(prompt, delegation_tools).await?;

        Ok(self.output(agent.role(), output.text, output.usage, &meter))
    }

    async fn hierarchical(
        &self,
        manager: &Arc<CrewAgent>,
        assignment: Option<usize>,
    ) -> Result<TaskOutput> {
        let meter = UsageMeter::default();
        let tools = self
            .scope(self.agents.to_vec(), manager.role(), &meter)
            .tools();

        let mut description = self.task.description.clone();
        if let Some(index) = assignment {
            description.push_str(&format!(
                "\n\nThe coworker best suited for this task is: {}",
                self.agents[index].role()
            ));
        }

        let prompt = self.prompt(manager, &description);
        let output = manager.execute(prompt, tools).await?;

        Ok(self.output(manager.role(), output.text, output.usage, &meter))
    }

    fn scope(
        &self,
        coworkers: Vec<Arc<CrewAgent>>,
        delegator: &str,
        meter: &UsageMeter,
    ) -> DelegationScope {
        DelegationScope::new(coworkers, delegator)
            .with_task(&self.task.name)
            .with_run_id(self.run_id)
            .with_memory(self.memory.clone())
            .with_usage_meter(meter.clone())
    }

    fn prompt(&self, agent: &CrewAgent, description: &str) -> String {
        let memories = if agent.memory() {
            self.memory.recent(&self.task.name, DEFAULT_RECALL_LIMIT)
        } else {
            Vec::new()
        };
        prompt::task_prompt(description, &self.task.expected_output, self.context, &memories)
    }

    fn output(&self, agent: &str, raw: String, usage: TokenUsage, meter: &UsageMeter) -> TaskOutput {
        let mut token_usage = usage;
        token_usage += meter.take();
        TaskOutput {
            name: self.task.name.clone(),
            description: self.task.description.clone(),
            agent: agent.to_string(),
            raw,
            token_usage,
        }
    }
}

fn render_task(task: &Task, interpolator: &Interpolator<'_>) -> Result<Task> {
    Ok(Task {
        name: task.name.clone(),
        description: interpolator.render(
            &format!("description of task '{}'", task.name),
            &task.description,
        )?,
        expected_output: interpolator.render(
            &format!("expected output of task '{}'", task.name),
            &task.expected_output,
        )?,
        agent: task.agent.clone(),
        context: task.context.clone(),
    })
}

/// Outputs handed to a task: its explicit context, or every earlier output
fn task_context(task: &Task, completed: &[TaskOutput]) -> Option<String> {
    let selected: Vec<&str> = match &task.context {
        Some(names) => names
            .iter()
            .filter_map(|name| completed.iter().find(|o| &o.name == name))
            .map(|o| o.raw.as_str())
            .collect(),
        None => completed.iter().map(|o| o.raw.as_str()).collect(),
    };

    if selected.is_empty() {
        None
    } else {
        Some(prompt::join_outputs(selected))
    }
}

fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

/// Builder for Crew
pub struct CrewBuilder {
    agents: Vec<CrewAgent>,
    tasks: Vec<Task>,
    process: Process,
    manager_llm: Option<Llm>,
    max_iter: usize,
    verbose: bool,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl Default for CrewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrewBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            tasks: Vec::new(),
            process: Process::Sequential,
            manager_llm: None,
            max_iter: 15,
            verbose: false,
            event_handler: None,
        }
    }

    /// Add an agent
    pub fn agent(mut self, agent: CrewAgent) -> Self {
        self.agents.push(agent);
        self
    }

    /// Add a task; tasks run in the order they are added
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Set the process
    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    /// Set the manager LLM (required for the hierarchical process)
    pub fn manager_llm(mut self, llm: Llm) -> Self {
        self.manager_llm = Some(llm);
        self
    }

    /// Iteration cap of the manager agent
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Log the manager's steps at `info`
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Event handler attached to every agent of the crew
    pub fn event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Validate and build the crew
    pub fn build(self) -> Result<Crew> {
        if self.agents.is_empty() {
            return Err(config_error("a crew needs at least one agent"));
        }
        if self.tasks.is_empty() {
            return Err(config_error("a crew needs at least one task"));
        }
        if self.max_iter == 0 {
            return Err(config_error("crew max_iter must be at least 1"));
        }
        if self.process == Process::Hierarchical && self.manager_llm.is_none() {
            return Err(config_error("the hierarchical process requires a manager LLM"));
        }

        let mut roles: HashMap<String, usize> = HashMap::new();
        for (index, agent) in self.agents.iter().enumerate() {
            if roles.insert(normalize_role(agent.role()), index).is_some() {
                return Err(config_error(&format!("duplicate agent role '{}'", agent.role())));
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut assignments = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(config_error("task names must not be empty"));
            }

            let assignment = match &task.agent {
                Some(role) => Some(*roles.get(&normalize_role(role)).ok_or_else(|| {
                    config_error(&format!(
                        "task '{}' is assigned to unknown agent '{}'",
                        task.name, role
                    ))
                })?),
                None if self.process == Process::Sequential => {
                    return Err(config_error(&format!(
                        "task '{}' needs an agent in a sequential crew",
                        task.name
                    )));
                }
                None => None,
            };

            for name in task.context.iter().flatten() {
                if !seen.contains(name.as_str()) {
                    return Err(config_error(&format!(
                        "task '{}' uses '{}' as context, which is not an earlier task",
                        task.name, name
                    )));
                }
            }

            if !seen.insert(task.name.as_str()) {
                return Err(config_error(&format!("duplicate task name '{}'", task.name)));
            }
            assignments.push(assignment);
        }

        Ok(Crew {
            agents: self.agents,
            tasks: self.tasks,
            assignments,
            process: self.process,
            manager_llm: self.manager_llm,
            max_iter: self.max_iter,
            verbose: self.verbose,
            event_handler: self.event_handler,
        })
    }
}

fn config_error(message: &str) -> CrewError {
    CrewError::Configuration(message.to_string())
}
