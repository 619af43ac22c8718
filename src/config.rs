//! Configuration System
//!
//! File-plus-environment configuration for the store location and logging.
//! Values merge in priority order: environment variables (`FENCELINE_*`),
//! then the optional config file, then defaults.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FencelineConfig {
    /// Durable store location (defaults to the platform data directory)
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_store_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("io", "fenceline", "fenceline") {
        return dirs.data_dir().join("store");
    }
    PathBuf::from(".fenceline/store")
}

impl Default for FencelineConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            logging: LoggingConfig::default(),
        }
    }
}

impl FencelineConfig {
    /// Load configuration, optionally merging an on-disk file.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FENCELINE")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder.build()?;

        // Absent sources deserialize to an empty table; serde defaults fill
        // in the rest.
        let cfg = raw.try_deserialize::<FencelineConfig>()?;
        Ok(cfg)
    }
}
