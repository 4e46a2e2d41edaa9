//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/watchlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/watchlens/` (~/.config/watchlens/)
//! - Data: `$XDG_DATA_HOME/watchlens/` (~/.local/share/watchlens/)
//! - State/Logs: `$XDG_STATE_HOME/watchlens/` (~/.local/state/watchlens/)

use crate::classifier::KeywordTables;
use crate::error::{Error, Result};
use crate::types::DailyGoals;
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
    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Goals applied when a user has no stored goals
    #[serde(default)]
    pub goals: DailyGoals,

    /// Classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Current-user resolution for the CLI
    #[serde(default)]
    pub user: UserConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics configuration
#[derive(Debug, Deserialize)]
pub struct AnalyticsConfig {
    /// Per-request deadline in milliseconds (0 disables the deadline)
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    /// Look-back window for top channels
    #[serde(default = "default_top_channels_days")]
    pub top_channels_days: u32,

    /// Look-back window for flagged content
    #[serde(default = "default_flagged_days")]
    pub flagged_days: u32,

    /// Number of days in the productivity report
    #[serde(default = "default_productivity_days")]
    pub productivity_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout(),
            top_channels_days: default_top_channels_days(),
            flagged_days: default_flagged_days(),
            productivity_days: default_productivity_days(),
        }
    }
}

impl AnalyticsConfig {
    /// Validate look-back windows against the ranges the analytics accept.
    pub fn validate(&self) -> Result<()> {
        if !(1..=90).contains(&self.top_channels_days) {
            return Err(Error::Config(
                "analytics.top_channels_days must be between 1 and 90".to_string(),
            ));
        }
        if !(1..=30).contains(&self.flagged_days) {
            return Err(Error::Config(
                "analytics.flagged_days must be between 1 and 30".to_string(),
            ));
        }
        if !(1..=90).contains(&self.productivity_days) {
            return Err(Error::Config(
                "analytics.productivity_days must be between 1 and 90".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured deadline, or `None` when disabled.
    pub fn query_timeout(&self) -> Option<std::time::Duration> {
        (self.query_timeout_ms > 0).then(|| std::time::Duration::from_millis(self.query_timeout_ms))
    }
}

fn default_query_timeout() -> u64 {
    30000
}

fn default_top_channels_days() -> u32 {
    30
}

fn default_flagged_days() -> u32 {
    7
}

fn default_productivity_days() -> u32 {
    7
}

/// Classifier configuration
#[derive(Debug, Deserialize, Default)]
pub struct ClassifierConfig {
    /// TOML file replacing the built-in keyword tables
    pub keywords_path: Option<PathBuf>,
}

impl ClassifierConfig {
    /// Keyword tables from `keywords_path`, or the built-in ones.
    pub fn keyword_tables(&self) -> Result<KeywordTables> {
        match &self.keywords_path {
            Some(path) => {
                let tables = KeywordTables::load_from(path)?;
                tracing::info!(path = %path.display(), version = tables.version, "Loaded keyword tables");
                Ok(tables)
            }
            None => Ok(KeywordTables::builtin()),
        }
    }
}

/// Current-user configuration
#[derive(Debug, Deserialize, Default)]
pub struct UserConfig {
    /// User id used when none is given on the command line
    pub default_user: Option<String>,
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

        config.analytics.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/watchlens/config.toml` (~/.config/watchlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("watchlens").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("watchlens")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("watchlens")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/watchlens/data.db` (~/.local/share/watchlens/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("watchlens.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
