//! Configuration management for Autoproject
//!
//! Handles loading and saving the TOML configuration, including API keys,
//! model settings for the planner and assistants, and the run wait policy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote assistants service settings
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Model used to turn goals into a project plan
    #[serde(default)]
    pub planner: ModelConfig,
    /// Model used for every reconciled assistant
    #[serde(default)]
    pub assistant: ModelConfig,
    /// Run wait policy
    #[serde(default)]
    pub run: RunConfig,
    /// Search provider settings
    #[serde(default)]
    pub web_search: WebSearchConfig,
    /// Browser automation settings
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Page scraping settings
    #[serde(default)]
    pub scrape: ScrapeConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Config {
    /// Apply the environment overrides the planner and assistant models honor
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.planner.apply_env("PLANNER_MODEL", "PLANNER_TEMPERATURE")?;
        self.assistant.apply_env("ASSISTANT_MODEL", "ASSISTANT_TEMPERATURE")
    }
}

/// Remote assistants service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (can be loaded from env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    pub api_key_env: String,
    /// Base URL for the API
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Get the API key, checking environment variable if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Model and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.2,
        }
    }
}

impl ModelConfig {
    fn apply_env(&mut self, model_var: &str, temperature_var: &str) -> Result<()> {
        self.apply_overrides(
            std::env::var(model_var).ok(),
            std::env::var(temperature_var).ok(),
            temperature_var,
        )
    }

    /// Apply raw override values; a temperature that is not a number is an
    /// error naming `temperature_var`
    fn apply_overrides(
        &mut self,
        model: Option<String>,
        temperature: Option<String>,
        temperature_var: &str,
    ) -> Result<()> {
        if let Some(model) = model
            && !model.is_empty()
        {
            self.model = model;
        }
        if let Some(raw) = temperature {
            self.temperature = raw.trim().parse::<f32>().map_err(|_| {
                Error::Config(format!("{} must be a number, got {:?}", temperature_var, raw))
            })?;
        }
        Ok(())
    }
}

/// How long and how often to wait on a remote run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Delay between run status polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Give up waiting on a run after this many seconds; unset waits forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_secs: None,
        }
    }
}

impl RunConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub endpoint: String,
    /// Result count used when the caller does not ask for one
    pub default_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "SERPER_API_KEY".to_string(),
            endpoint: "https://google.serper.dev/search".to_string(),
            default_results: 5,
        }
    }
}

impl WebSearchConfig {
    pub fn get_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Default page load timeout (seconds)
    pub timeout_secs: u64,
    /// Screenshot output directory
    pub screenshot_dir: PathBuf,
    /// Bound on the long edge of a saved screenshot (pixels)
    pub max_long_edge: u32,
    /// Bound on the short edge of a saved screenshot (pixels)
    pub max_short_edge: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            screenshot_dir: PathBuf::from("storage/screenshots"),
            max_long_edge: 2000,
            max_short_edge: 768,
        }
    }
}

/// Page scraping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Maximum characters per returned chunk
    pub chunk_size: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self { chunk_size: 8000 }
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding saved project files
    pub projects_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("projects"),
        }
    }
}

impl GeneralConfig {
    /// Path of the saved project file with the given name
    pub fn project_path(&self, name: &str) -> PathBuf {
        self.projects_dir.join(format!("{}.json", name))
    }
}

fn resolve_key(direct: Option<&str>, env_name: &str) -> Option<String> {
    if let Some(key) = direct
        && !key.is_empty()
    {
        return Some(key.to_string());
    }

    std::env::var(env_name).ok().filter(|key| !key.is_empty())
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("autoproject").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the manager, returning the configuration with environment
    /// overrides applied
    pub fn into_effective(self) -> Result<Config> {
        let mut config = self.config;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
