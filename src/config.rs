use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agents::{Route, RouterMode};
use crate::error::ConciergeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub handlers: HandlersConfig,
    pub router: RouterConfig,
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Environment variable holding the API credential
    pub api_key_env: String,
    pub api_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            timeout_ms: 120000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// The only document the Support handler may fetch
    pub faq_url: String,
    pub fetch_timeout_ms: u64,
    pub search_timeout_ms: u64,
    pub search_max_results: usize,
    /// 0 disables truncation
    pub max_document_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            faq_url: "https://www.nugenomics.in/faqs/".to_string(),
            fetch_timeout_ms: 10000,
            search_timeout_ms: 30000,
            search_max_results: 5,
            max_document_chars: 20000,
        }
    }
}

impl ToolsConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlersConfig {
    pub max_tool_cycles: u32,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self { max_tool_cycles: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub mode: RouterMode,
    pub default_route: Route,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: RouterMode::Model,
            default_route: Route::Wellness,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Most recent turns sent to the model; 0 sends all
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
            handlers: HandlersConfig::default(),
            router: RouterConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values that would make every turn fail
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.handlers.max_tool_cycles == 0 {
            return Err(ConciergeError::Config("handlers.max_tool_cycles must be at least 1".to_string()));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConciergeError::Config("llm.max_tokens must be at least 1".to_string()));
        }
        if !self.tools.faq_url.starts_with("http://") && !self.tools.faq_url.starts_with("https://") {
            return Err(ConciergeError::Config(format!(
                "tools.faq_url must be an http(s) URL, got {:?}",
                self.tools.faq_url
            )));
        }
        Ok(())
    }
}
