//! Logging System
//!
//! Structured logging built on the `tracing` crate. The embedding process
//! initializes once at startup; library code only emits through the
//! `tracing` macros.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Log file path; None logs to stdout
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, stdout only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            file: None,
            color: default_true(),
        }
    }
}

/// Initialize the logging system.
///
/// The `FENCELINE_LOG` environment variable overrides the configured level
/// with a full `EnvFilter` directive string.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_env("FENCELINE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    if config.format != "json" && config.format != "text" {
        return Err(ConfigError::Invalid(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            config.format
        )));
    }

    let base_subscriber = Registry::default().with(filter);

    let file_writer = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::Invalid(format!("Failed to create log directory: {}", e))
                })?;
            }
            Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        ConfigError::Invalid(format!("Failed to open log file {:?}: {}", path, e))
                    })?,
            )
        }
        None => None,
    };

    match (config.format.as_str(), file_writer) {
        ("json", Some(writer)) => {
            base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(writer),
                )
                .init();
        }
        ("json", None) => {
            base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        (_, Some(writer)) => {
            base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
        (_, None) => {
            base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(config.color)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }

    Ok(())
}
