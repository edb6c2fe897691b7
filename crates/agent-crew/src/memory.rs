//! Short-term crew memory
//!
//! One store lives for the duration of a kickoff and records the output of
//! every finished task. Agents with memory enabled see the most recent
//! entries from other tasks in their task prompt.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Number of entries shown to an agent
pub const DEFAULT_RECALL_LIMIT: usize = 5;

/// A remembered task outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    /// Role of the agent that produced the output
    pub agent: String,
    /// Task name
    pub task: String,
    /// Output text
    pub output: String,
}

/// Run-scoped store of task outcomes
#[derive(Debug, Default)]
pub struct CrewMemory {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl CrewMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task outcome
    pub fn save(&self, agent: impl Into<String>, task: impl Into<String>, output: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(MemoryEntry {
            agent: agent.into(),
            task: task.into(),
            output: output.into(),
        });
    }

    /// Most recent entries (newest first) not produced by `exclude_task`
    pub fn recent(&self, exclude_task: &str, limit: usize) -> Vec<MemoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .rev()
            .filter(|e| e.task != exclude_task)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
