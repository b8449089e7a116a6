//! Configuration management for Chatline
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatlineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Chatline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Dispatcher client registration
    #[serde(default)]
    pub client: ClientConfig,

    /// Scrollback retention and grouping
    #[serde(default)]
    pub scrollback: ScrollbackConfig,

    /// Persisted conversation log
    #[serde(default)]
    pub log_store: LogStoreConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Client registration with the transport dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Well-known client name
    #[serde(default = "default_client_name")]
    pub name: String,

    /// Append a unique suffix to the name so several instances can coexist
    #[serde(default = "default_uniquify_name")]
    pub uniquify_name: bool,
}

fn default_client_name() -> String {
    "Chatline".to_string()
}

fn default_uniquify_name() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            uniquify_name: default_uniquify_name(),
        }
    }
}

/// Scrollback retention and timestamp grouping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrollbackConfig {
    /// Messages older than this get a divider right away; newer ones get one
    /// scheduled this long after the message time (seconds)
    #[serde(default = "default_immediate_window")]
    pub immediate_window_secs: u64,

    /// A conversation whose newest entry is older than this is idle (seconds)
    #[serde(default = "default_recent_window")]
    pub recent_window_secs: u64,

    /// Real entries kept while the conversation is active
    #[serde(default = "default_recent_length")]
    pub recent_length: usize,

    /// Real entries kept once the conversation went idle
    #[serde(default = "default_idle_length")]
    pub idle_length: usize,

    /// Logged messages fetched when a conversation source is created
    #[serde(default = "default_history_lines")]
    pub history_lines: usize,
}

fn default_immediate_window() -> u64 {
    60
}

fn default_recent_window() -> u64 {
    15 * 60
}

fn default_recent_length() -> usize {
    20
}

fn default_idle_length() -> usize {
    5
}

fn default_history_lines() -> usize {
    10
}

impl Default for ScrollbackConfig {
    fn default() -> Self {
        Self {
            immediate_window_secs: default_immediate_window(),
            recent_window_secs: default_recent_window(),
            recent_length: default_recent_length(),
            idle_length: default_idle_length(),
            history_lines: default_history_lines(),
        }
    }
}

/// Persisted conversation log location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogStoreConfig {
    /// SQLite file; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "chatline=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatlineError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatlineError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(name) = std::env::var("CHATLINE_CLIENT_NAME") {
            self.client.name = name;
        }

        if let Ok(path) = std::env::var("CHATLINE_LOG_DB") {
            self.log_store.path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("CHATLINE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("CHATLINE_JSON_LOGS") {
            match json.parse() {
                Ok(value) => self.logging.json_format = value,
                Err(_) => tracing::warn!("Invalid CHATLINE_JSON_LOGS: {}", json),
            }
        }

        if let Ok(lines) = std::env::var("CHATLINE_HISTORY_LINES") {
            if let Ok(value) = lines.parse() {
                self.scrollback.history_lines = value;
            } else {
                tracing::warn!("Invalid CHATLINE_HISTORY_LINES: {}", lines);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "chatline=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.client.name.trim().is_empty() {
            return Err(ChatlineError::Config("client.name cannot be empty".to_string()).into());
        }

        let scrollback = &self.scrollback;
        if scrollback.immediate_window_secs == 0 {
            return Err(ChatlineError::Config(
                "scrollback.immediate_window_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if scrollback.recent_window_secs == 0 {
            return Err(ChatlineError::Config(
                "scrollback.recent_window_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if scrollback.idle_length == 0 || scrollback.recent_length == 0 {
            return Err(ChatlineError::Config(
                "scrollback lengths must be greater than 0".to_string(),
            )
            .into());
        }

        if scrollback.idle_length > scrollback.recent_length {
            return Err(ChatlineError::Config(format!(
                "scrollback.idle_length ({}) must not exceed scrollback.recent_length ({})",
                scrollback.idle_length, scrollback.recent_length
            ))
            .into());
        }

        if scrollback.history_lines == 0 {
            return Err(ChatlineError::Config(
                "scrollback.history_lines must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
