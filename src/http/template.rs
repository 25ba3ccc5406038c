//! HTML template rendering for the console pages
//!
//! Templates are embedded in the binary and rendered with minijinja.

use crate::Result;
use minijinja::Environment;
use serde::Serialize;

/// Template renderer for HTML pages using minijinja
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Renderer with the embedded console templates
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        // Auto-escape HTML; provider responses are rendered verbatim
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);

        env.add_template("base.html", include_str!("../../static/console/base.html"))?;
        env.add_template(
            "overview.html",
            include_str!("../../static/console/overview.html"),
        )?;
        env.add_template(
            "provider.html",
            include_str!("../../static/console/provider.html"),
        )?;

        Ok(Self { env })
    }

    /// Render a template with serializable context
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}
