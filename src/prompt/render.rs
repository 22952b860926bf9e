//! Prompt Renderer - Render templates with context variables using Handlebars

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{ChunkdError, Result};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts embed raw JSON, never escape it
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| ChunkdError::Validation(format!("Failed to render template: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple() {
        let renderer = PromptRenderer::new();
        let result = renderer.render_with("Hello, {{name}}!", &json!({"name": "World"})).unwrap();
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_render_missing_variable_empty_string() {
        let renderer = PromptRenderer::default();
        let result = renderer.render_with("Hello, {{name}}!", &json!({})).unwrap();
        assert_eq!(result, "Hello, !");
    }

    #[test]
    fn test_render_does_not_escape_json() {
        let renderer = PromptRenderer::new();
        let result = renderer
            .render_with("Input: {{tasks_json}}", &json!({"tasks_json": "[{\"title\": \"<a & b>\"}]"}))
            .unwrap();
        assert_eq!(result, "Input: [{\"title\": \"<a & b>\"}]");
    }

    #[test]
    fn test_render_invalid_template() {
        let renderer = PromptRenderer::new();
        assert!(renderer.render_with("{{#if}}", &json!({})).is_err());
    }
}
