//! Prompt Loader - Load and cache prompt templates
//!
//! Templates are read from `<dir>/<name>.hbs` when a prompts directory is
//! configured and the file exists; otherwise the embedded copy is used.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{ChunkdError, Result};
use crate::prompt::embedded::embedded;

/// Loads and caches prompt templates
pub struct PromptLoader {
    /// Optional directory of override templates
    templates_dir: Option<PathBuf>,
    /// In-memory cache of loaded templates
    cache: RwLock<HashMap<String, String>>,
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

impl PromptLoader {
    /// Create a loader that checks `templates_dir` before the embedded set
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: Some(templates_dir.as_ref().to_path_buf()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a loader that only serves embedded templates
    pub fn embedded_only() -> Self {
        Self {
            templates_dir: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load a template by name (without extension)
    pub fn load(&self, name: &str) -> Result<String> {
        if let Ok(cache) = self.cache.read()
            && let Some(content) = cache.get(name)
        {
            return Ok(content.clone());
        }

        let content = match self.template_path(name) {
            Some(path) if path.exists() => {
                log::debug!("Loading prompt template from {}", path.display());
                std::fs::read_to_string(&path)?
            }
            _ => embedded(name)
                .map(str::to_string)
                .ok_or_else(|| ChunkdError::NotFound(format!("prompt template '{}'", name)))?,
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(name.to_string(), content.clone());
        }

        Ok(content)
    }

    /// Path an override for `name` would live at
    pub fn template_path(&self, name: &str) -> Option<PathBuf> {
        self.templates_dir.as_ref().map(|dir| dir.join(format!("{}.hbs", name)))
    }

    /// Drop cached templates so edited files are re-read
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}
