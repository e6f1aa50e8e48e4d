//! Configuration management for parcopy
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Database server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database to dump (defaults to the current user name when unset)
    #[serde(default)]
    pub dbname: Option<String>,

    /// Database user name (defaults to the current user name when unset)
    #[serde(default)]
    pub username: Option<String>,
}

/// Export-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Target size of each dump file in MB
    #[serde(default = "default_target_size_mb")]
    pub target_size_mb: u64,

    /// Output format for dump files
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,

    /// Number of rows sampled for average-row-size estimation
    #[serde(default = "default_sample_size")]
    pub sample_size: u32,

    /// Worker process cap (defaults to available CPUs when unset)
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Dispatcher poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Override for the row-size inflation factor
    /// (defaults to [`crate::export::sampler::ROW_SIZE_INFLATION`])
    #[serde(default)]
    pub inflation: Option<f64>,
}

/// Output format options for dump files
///
/// These map directly onto the `WITH <format>` clause of `\copy` and onto
/// the extension of each output file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values
    Csv,

    /// PostgreSQL's tab-delimited text format
    Text,

    /// PostgreSQL's binary COPY format
    Binary,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_target_size_mb() -> u64 {
    128
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Csv
}

fn default_sample_size() -> u32 {
    100
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: None,
            username: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_size_mb: default_target_size_mb(),
            format: default_output_format(),
            sample_size: default_sample_size(),
            concurrency: None,
            poll_interval_ms: default_poll_interval_ms(),
            inflation: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, falling back to defaults when the
    /// default config file does not exist.
    ///
    /// # Arguments
    /// * `path` - Explicit config file path, or `None` for the default path
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            // A missing explicit path is a user error; a missing default
            // path just means nothing has been configured yet.
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parcopy")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.export.target_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.target_size_mb".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.export.sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.sample_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if let Some(0) = self.export.concurrency {
            return Err(ConfigError::InvalidValue {
                field: "export.concurrency".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if let Some(inflation) = self.export.inflation
            && !(inflation.is_finite() && inflation > 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: "export.inflation".to_string(),
                value: inflation.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Per-file target size in bytes
    pub fn target_bytes(&self) -> u64 {
        self.export.target_size_mb * 1024 * 1024
    }

    /// Dispatcher poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.export.poll_interval_ms)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl OutputFormat {
    /// Parse a format name as accepted on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "text" => Some(OutputFormat::Text),
            "binary" => Some(OutputFormat::Binary),
            _ => None,
        }
    }

    /// File extension for dump files in this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "text",
            OutputFormat::Binary => "binary",
        }
    }

    /// The `WITH <format>` clause understood by `\copy`
    pub fn copy_clause(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "CSV",
            OutputFormat::Text => "TEXT",
            OutputFormat::Binary => "BINARY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.export.target_size_mb, 128);
        assert_eq!(config.export.format, OutputFormat::Csv);
        assert_eq!(config.export.sample_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_bytes() {
        let config = Config::default();
        assert_eq!(config.target_bytes(), 128 * 1024 * 1024);
    }

    #[test]
    fn test_output_format_round_trip() {
        assert_eq!(OutputFormat::parse("CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("Binary"), Some(OutputFormat::Binary));
        assert_eq!(OutputFormat::parse("parquet"), None);

        assert_eq!(OutputFormat::Csv.extension(), "csv");
        assert_eq!(OutputFormat::Binary.copy_clause(), "BINARY");
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let mut config = Config::default();
        config.export.target_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.export.concurrency = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_inflation() {
        let mut config = Config::default();
        config.export.inflation = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_from_toml() {
        let toml_str = r#"
            [connection]
            host = "db.internal"
            port = 5433

            [export]
            target_size_mb = 256
            format = "text"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 5433);
        assert_eq!(config.export.target_size_mb, 256);
        assert_eq!(config.export.format, OutputFormat::Text);
        assert_eq!(config.logging.level, LogLevel::Debug);
        // Unset sections keep their defaults
        assert_eq!(config.export.sample_size, 100);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let missing = Path::new("/nonexistent/parcopy-config.toml");
        assert!(Config::load_from_file(Some(missing)).is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.connection.host, config.connection.host);
        assert_eq!(parsed.export.target_size_mb, config.export.target_size_mb);
    }
}
