use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ChunkdError;
use crate::llm::{ModelRole, ResponseShape};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub decompose: DecomposeConfig,
    pub storage: StorageConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Write to the data dir log file instead of stderr
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Include the underlying error text in 4xx/5xx bodies
    pub expose_error_details: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
            expose_error_details: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_shape: ResponseShape,
    pub models: ModelsConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_ms: 60000,
            temperature: 0.2,
            max_output_tokens: 1024,
            response_shape: ResponseShape::Auto,
            models: ModelsConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> crate::error::Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ChunkdError::Configuration(format!(
                "environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

/// Model identifier per call site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub chunk: String,
    pub score: String,
    pub rebalance: String,
    pub simulate: String,
    pub notify: String,
    pub analytics: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            chunk: "gemini-2.5-pro".to_string(),
            score: "gemini-1.5-pro".to_string(),
            rebalance: "gemini-1.5-pro".to_string(),
            simulate: "gemini-1.5-pro".to_string(),
            notify: "gemini-1.5-flash".to_string(),
            analytics: "gemini-1.5-flash".to_string(),
        }
    }
}

impl ModelsConfig {
    pub fn for_role(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Chunk => &self.chunk,
            ModelRole::Score => &self.score,
            ModelRole::Rebalance => &self.rebalance,
            ModelRole::Simulate => &self.simulate,
            ModelRole::Notify => &self.notify,
            ModelRole::Analytics => &self.analytics,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposeConfig {
    pub chunk_size_minutes: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Substitute one full-length chunk per task when generation fails
    pub fallback: bool,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            chunk_size_minutes: 60,
            temperature: 0.2,
            max_output_tokens: 2048,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("chunkd.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory of `<name>.hbs` files overriding the embedded templates
    pub dir: Option<PathBuf>,
}

/// Base directory for the database and log files
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let (config, warnings) = Self::load_with_warnings(config_path)?;
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        Ok(config)
    }

    /// Like `load`, but return fallback problems instead of logging them.
    ///
    /// Used before logging is initialized, so the caller can report them later.
    pub fn load_with_warnings(config_path: Option<&PathBuf>) -> Result<(Self, Vec<String>)> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let config = Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
            return Ok((config, Vec::new()));
        }

        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();

        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }

        // Fallback location: ./<project>.yml
        candidates.push(PathBuf::from(format!("{}.yml", project_name)));

        Ok(Self::load_first(&candidates))
    }

    /// First candidate that exists and parses, or defaults
    fn load_first(candidates: &[PathBuf]) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return (config, warnings),
                Err(e) => warnings.push(format!("Failed to load config from {}: {:#}", path.display(), e)),
            }
        }

        if warnings.is_empty() {
            log::info!("No config file found, using defaults");
        } else {
            warnings.push("Using default configuration".to_string());
        }
        (Self::default(), warnings)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
