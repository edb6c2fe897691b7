//! Prompt construction for crew agents

use crate::memory::MemoryEntry;

/// Heading that introduces the expected output in a task prompt
pub const EXPECTED_OUTPUT_PREFIX: &str = "This is the expected criteria for your final answer: ";

/// System prompt derived from an agent's persona
pub fn system_prompt(role: &str, goal: &str, backstory: &str) -> String {
    format!(
        "You are {role}. {backstory}\nYour personal goal is: {goal}\n\n\
         When you have gathered enough information, reply with your complete final answer \
         as plain text. Use the tools available to you when they help."
    )
}

/// Task prompt: description, expected output, optional context and memory
pub fn task_prompt(
    description: &str,
    expected_output: &str,
    context: Option<&str>,
    memories: &[MemoryEntry],
) -> String {
    let mut prompt = format!(
        "Current Task: {description}\n\n{EXPECTED_OUTPUT_PREFIX}{expected_output}\n\
         You MUST return the actual complete content as the final answer, not a summary."
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }

    if !memories.is_empty() {
        prompt.push_str("\n\n# Useful results from earlier in this run:");
        for entry in memories {
            prompt.push_str(&format!(
                "\n- [{}] {}: {}",
                entry.task,
                entry.agent,
                entry.output.trim()
            ));
        }
    }

    prompt.push_str("\n\nBegin! Give your best final answer.");
    prompt
}

/// Joins task outputs into a single context block
pub fn join_outputs<'a>(outputs: impl IntoIterator<Item = &'a str>) -> String {
    outputs
        .into_iter()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n\n----------\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_contains_persona() {
        let prompt = system_prompt("Stock News Analyst", "Summarise news", "Ten years of tape.");
        assert!(prompt.starts_with("You are Stock News Analyst. Ten years of tape."));
        assert!(prompt.contains("Your personal goal is: Summarise news"));
    }

    #[test]
    fn test_task_prompt_sections() {
        let memories = vec![MemoryEntry {
            agent: "Senior stock price Analyst".into(),
            task: "get_stock_price".into(),
            output: "AAPL price UP\n".into(),
        }];
        let prompt = task_prompt(
            "Write the newsletter",
            "3 paragraphs",
            Some("price: UP"),
            &memories,
        );

        assert!(prompt.contains("Current Task: Write the newsletter"));
        assert!(prompt.contains("This is the expected criteria for your final answer: 3 paragraphs"));
        assert!(prompt.contains("This is the context you're working with:\nprice: UP"));
        assert!(prompt.contains("- [get_stock_price] Senior stock price Analyst: AAPL price UP"));
    }

    #[test]
    fn test_task_prompt_without_context_or_memory() {
        let prompt = task_prompt("Analyse", "A trend", Some("  "), &[]);
        assert!(!prompt.contains("context you're working with"));
        assert!(!prompt.contains("earlier in this run"));
    }

    #[test]
    fn test_join_outputs() {
        assert_eq!(join_outputs(["a\n", " b"]), "a\n\n----------\n\nb");
    }
}
