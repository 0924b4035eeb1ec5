//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pipescope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pipescope/` (~/.config/pipescope/)
//! - Data: `$XDG_DATA_HOME/pipescope/` (~/.local/share/pipescope/)
//! - State/Logs: `$XDG_STATE_HOME/pipescope/` (~/.local/state/pipescope/)
//!
//! A loaded [`Config`] is handed to [`crate::PipelineLogs::new`] explicitly;
//! nothing in the engine reads configuration on its own.

use crate::error::{Error, Result};
use crate::store::is_valid_table_name;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

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
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Live record store configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Mock record generation
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Metrics aggregation
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Alert thresholds
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Live record store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Skip the live store and always serve mock data
    #[serde(default)]
    pub demo_mode: bool,

    /// Path to the SQLite store (defaults to the data directory)
    pub database_path: Option<PathBuf>,

    /// Table holding execution logs
    #[serde(default = "default_table")]
    pub table: String,

    /// Bound on a live-store query in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Serve mock data when the live store has nothing for the window
    #[serde(default = "default_true")]
    pub fallback_on_empty: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            demo_mode: false,
            database_path: None,
            table: default_table(),
            timeout_ms: default_timeout_ms(),
            fallback_on_empty: true,
        }
    }
}

impl SourceConfig {
    /// Store path, falling back to `$XDG_DATA_HOME/pipescope/pipeline_logs.db`
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(Config::database_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_table() -> String {
    "pipeline_logs".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// Mock record generation
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Mean synthetic executions per hour
    #[serde(default = "default_rate_per_hour")]
    pub rate_per_hour: f64,

    /// Fixed seed for reproducible demo data
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rate_per_hour: default_rate_per_hour(),
            seed: None,
        }
    }
}

fn default_rate_per_hour() -> f64 {
    4.0
}

/// Metrics aggregation
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    /// Time bucket width in minutes
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: i64,

    /// Tail percentile reported alongside the median, in (0, 100]
    #[serde(default = "default_percentile")]
    pub percentile: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bucket_minutes: default_bucket_minutes(),
            percentile: default_percentile(),
        }
    }
}

fn default_bucket_minutes() -> i64 {
    60
}

fn default_percentile() -> f64 {
    95.0
}

/// Alert thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    /// Alert when the success rate drops below this percentage
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,

    /// Alert when mean response time exceeds this many milliseconds
    #[serde(default = "default_max_avg_response_ms")]
    pub max_avg_response_ms: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_success_rate: default_min_success_rate(),
            max_avg_response_ms: default_max_avg_response_ms(),
        }
    }
}

fn default_min_success_rate() -> f64 {
    95.0
}

fn default_max_avg_response_ms() -> f64 {
    5000.0
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !is_valid_table_name(&self.source.table) {
            return Err(Error::Config(format!(
                "source.table {:?} is not a valid table name",
                self.source.table
            )));
        }
        if !self.generator.rate_per_hour.is_finite() || self.generator.rate_per_hour < 0.0 {
            return Err(Error::Config(
                "generator.rate_per_hour must be a non-negative number".to_string(),
            ));
        }
        if self.metrics.bucket_minutes <= 0 {
            return Err(Error::Config(
                "metrics.bucket_minutes must be positive".to_string(),
            ));
        }
        if !(self.metrics.percentile > 0.0 && self.metrics.percentile <= 100.0) {
            return Err(Error::Config(
                "metrics.percentile must be in (0, 100]".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pipescope/config.toml` (~/.config/pipescope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pipescope").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/pipescope/` (~/.local/share/pipescope/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pipescope")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pipescope/` (~/.local/state/pipescope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pipescope")
    }

    /// Returns the default store path
    ///
    /// `$XDG_DATA_HOME/pipescope/pipeline_logs.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("pipeline_logs.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pipescope/pipescope.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pipescope.log")
    }
}
