//! Logging configuration and subscriber setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{CinemetricsError, CinemetricsResult};

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Global log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
    /// Use colored output (pretty and compact formats)
    pub colored: bool,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// General information
    Info,
    /// Debug information
    Debug,
    /// Very verbose debug information
    Trace,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> CinemetricsResult<Self> {
        match level_str.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(CinemetricsError::config(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(format_str: &str) -> CinemetricsResult<Self> {
        match format_str.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(CinemetricsError::config(format!(
                "Invalid log format: {}. Valid formats: pretty, compact, json",
                format_str
            ))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            target: false,
            colored: true,
        }
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    /// Create a new logging system with configuration
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Filter built from `RUST_LOG` when set, otherwise from the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_filter()))
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// reserved for command output.
    pub fn initialize(&self) -> CinemetricsResult<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.config.target)
            .with_writer(std::io::stderr);

        let installed = match self.config.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().with_ansi(self.config.colored).try_init(),
            LogFormat::Compact => builder.compact().with_ansi(self.config.colored).try_init(),
        };

        installed.map_err(|e| {
            CinemetricsError::config(format!("Failed to install log subscriber: {}", e))
        })?;

        tracing::debug!(
            level = self.config.level.as_filter(),
            format = ?self.config.format,
            version = env!("CARGO_PKG_VERSION"),
            "logging initialized"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::parse("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::parse("loud").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_logging_config_from_toml() {
        let config: LoggingConfig = toml::from_str("level = \"trace\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.colored);
    }
}
