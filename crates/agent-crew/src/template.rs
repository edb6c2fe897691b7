//! Input interpolation for agent and task text
//!
//! Roles, goals, backstories, task descriptions and expected outputs may
//! contain `{{ name }}` placeholders that are filled from the kickoff
//! inputs. Rendering is strict: a placeholder without a matching input is
//! an error, raised before any LLM call is made.

use crate::{CrewError, Result};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;

/// Renders crew text templates against kickoff inputs
pub struct Interpolator<'a> {
    env: Environment<'static>,
    inputs: &'a HashMap<String, String>,
}

impl<'a> Interpolator<'a> {
    /// Create an interpolator over the given inputs
    pub fn new(inputs: &'a HashMap<String, String>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env, inputs }
    }

    /// Render one template; `field` names it in error messages
    pub fn render(&self, field: &str, template: &str) -> Result<String> {
        if !template.contains("{{") && !template.contains("{%") {
            return Ok(template.to_string());
        }

        self.env
            .render_str(template, self.inputs)
            .map_err(|e| CrewError::Template {
                field: field.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> HashMap<String, String> {
        HashMap::from([("ticket".to_string(), "AAPL".to_string())])
    }

    #[test]
    fn test_render_placeholder() {
        let inputs = inputs();
        let interpolator = Interpolator::new(&inputs);
        let out = interpolator
            .render("goal", "Find the {{ ticket }} stock price and analyses trends")
            .unwrap();
        assert_eq!(out, "Find the AAPL stock price and analyses trends");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let inputs = HashMap::new();
        let interpolator = Interpolator::new(&inputs);
        let text = "eg. STOCK = 'APPL, price UP'\n";
        assert_eq!(interpolator.render("expected_output", text).unwrap(), text);
    }

    #[test]
    fn test_undefined_input_is_an_error() {
        let inputs = inputs();
        let interpolator = Interpolator::new(&inputs);
        let err = interpolator
            .render("description", "Research {{ company }}")
            .unwrap_err();
        match err {
            CrewError::Template { field, .. } => assert_eq!(field, "description"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_html_escaping() {
        let inputs = HashMap::from([("ticket".to_string(), "<BRK.B>".to_string())]);
        let interpolator = Interpolator::new(&inputs);
        assert_eq!(interpolator.render("role", "{{ ticket }}").unwrap(), "<BRK.B>");
    }
}
