//! Core Agent trait definition

use crate::{Context, Result};
use async_trait::async_trait;

/// Core trait that all agents must implement
///
/// Input and output are plain strings: a task prompt goes in, the agent's
/// final answer comes out. Run-scoped state (run id, current task, kickoff
/// inputs) travels in the [`Context`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process input and return output
    async fn process(&self, input: String, context: &mut Context) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        async fn process(&self, input: String, context: &mut Context) -> Result<String> {
            context.set_task("echo");
            Ok(input)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_agent_object_safety() {
        let agent: Box<dyn Agent> = Box::new(Echo);
        let mut ctx = Context::new();

        let out = agent.process("hi".to_string(), &mut ctx).await.unwrap();
        assert_eq!(out, "hi");
        assert_eq!(agent.name(), "echo");
        assert_eq!(ctx.task(), Some("echo"));
    }
}
