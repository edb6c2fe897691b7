//! HTML templates

use minijinja::Environment;
use serde::Serialize;

const INDEX_TEMPLATE: &str = "index.html";

/// Page state rendered by the research form
#[derive(Debug, Default, Serialize)]
pub struct Page {
    /// Ticker echoed back into the form field
    pub ticket: String,
    /// Error banner
    pub error: Option<String>,
    /// Rendered newsletter (already sanitized HTML)
    pub report_html: Option<String>,
}

/// Template environment; `.html` templates are auto-escaped
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Load the built-in templates
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../../templates/index.html"))?;
        Ok(Self { env })
    }

    /// Render the research page
    pub fn render_page(&self, page: &Page) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX_TEMPLATE)?.render(page)
    }
}
