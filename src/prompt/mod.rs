//! Prompt System - Template loading and rendering
//!
//! Prompt templates are Handlebars strings, embedded in the binary and
//! optionally overridden from a directory of `.hbs` files.

mod embedded;
mod loader;
mod render;

use serde::Serialize;

use crate::error::Result;

pub use embedded::TEMPLATE_NAMES;
pub use loader::PromptLoader;
pub use render::PromptRenderer;

/// Loader and renderer bundled together
#[derive(Default)]
pub struct Prompts {
    loader: PromptLoader,
    renderer: PromptRenderer,
}

impl Prompts {
    pub fn new(loader: PromptLoader) -> Self {
        Self {
            loader,
            renderer: PromptRenderer::new(),
        }
    }

    /// Load the named template and render it with `context`
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        let template = self.loader.load(name)?;
        self.renderer.render_with(&template, context)
    }
}
