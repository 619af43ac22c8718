//! Error types for the geofence registry and dispatch pipeline.

use thiserror::Error;

/// Durable store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record at key {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// Registry-facing errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid geofence definition: {0}")]
    InvalidDefinition(String),

    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("OS registration failed: {cause}")]
    OsRegistrationFailed { cause: String },

    #[error("No active region for fence {0:?}")]
    NotFound(String),

    #[error(
        "OS operation for fence {id:?} succeeded but the durable record write failed: {source}"
    )]
    StorePersistFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Dispatch coordinator errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch target was never initialized")]
    DispatchTargetUnset,

    #[error("Worker failed to start: {cause}")]
    WorkerStartFailed { cause: String },

    #[error("Worker delivery failed: {cause}")]
    DeliveryFailed { cause: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
