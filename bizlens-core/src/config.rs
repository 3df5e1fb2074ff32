//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/bizlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/bizlens/` (~/.config/bizlens/)
//! - Data: `$XDG_DATA_HOME/bizlens/` (~/.local/share/bizlens/)
//! - State/Logs: `$XDG_STATE_HOME/bizlens/` (~/.local/state/bizlens/)
//!
//! Configuration is always an explicit value threaded into component
//! constructors; nothing in this crate reads a process-wide singleton.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Text-generation API configuration (optional; analysis without it is
    /// limited to prompt assembly)
    #[serde(default)]
    pub llm: Option<LlmConfig>,

    /// Analysis pipeline tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Request rate limiting
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Text-generation API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// API key (bearer token)
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token ceiling
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::Config("llm.endpoint must not be empty".to_string()));
        }
        if self.model.is_empty() {
            return Err(Error::Config("llm.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout() -> u64 {
    30
}

/// Analysis pipeline tuning
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Row count above which the prompt switches from full data to
    /// aggregation plus representative samples
    #[serde(default = "default_large_table_rows")]
    pub large_table_rows: usize,

    /// Target size of the representative sample
    #[serde(default = "default_sample_target")]
    pub sample_target: usize,

    /// Maximum sample rows rendered into the prompt
    #[serde(default = "default_prompt_sample_rows")]
    pub prompt_sample_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            large_table_rows: default_large_table_rows(),
            sample_target: default_sample_target(),
            prompt_sample_rows: default_prompt_sample_rows(),
        }
    }
}

fn default_large_table_rows() -> usize {
    100
}

fn default_sample_target() -> usize {
    60
}

fn default_prompt_sample_rows() -> usize {
    20
}

/// Rate-limiter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Window length in seconds
    #[serde(default = "default_limit_window")]
    pub window_secs: u64,

    /// Max analysis requests per identity per window
    #[serde(default = "default_limit_max")]
    pub max_requests: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_limit_window(),
            max_requests: default_limit_max(),
        }
    }
}

fn default_limit_window() -> u64 {
    60
}

fn default_limit_max() -> u32 {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        if let Some(llm) = &config.llm {
            llm.validate()?;
        }

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/bizlens/config.toml` (~/.config/bizlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("bizlens").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("bizlens")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("bizlens")
    }

    /// Returns the database file path
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("bizlens.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.is_none());
        assert_eq!(config.analysis.large_table_rows, 100);
        assert_eq!(config.analysis.sample_target, 60);
        assert_eq!(config.limits.max_requests, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[llm]
endpoint = "https://api.example.com/v1/chat/completions"
api_key = "sk_test"
model = "analyst-large"
temperature = 0.5

[analysis]
large_table_rows = 200

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "analyst-large");
        assert_eq!(llm.temperature, 0.5);
        assert_eq!(llm.max_tokens, 2000);
        assert_eq!(llm.timeout_secs, 30);
        assert_eq!(config.analysis.large_table_rows, 200);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_llm_config_validation() {
        let valid = LlmConfig {
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            api_key: Some("sk_test".to_string()),
            model: "analyst-large".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 30,
        };
        assert!(valid.validate().is_ok());

        let bad_temp = LlmConfig {
            temperature: 5.0,
            ..valid.clone()
        };
        assert!(bad_temp.validate().is_err());

        let no_model = LlmConfig {
            model: String::new(),
            ..valid
        };
        assert!(no_model.validate().is_err());
    }
}
