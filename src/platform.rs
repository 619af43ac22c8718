//! OS Geofencing Subsystem boundary
//!
//! The native geofencing API is callback-based and vendor-specific; this
//! module models it as a future-returning collaborator so the registry and
//! coordinator logic stay synchronous and deterministic. Production builds
//! supply a platform adapter; tests supply a fake.

use crate::types::{DispatchHandle, GeofenceDefinition, TransitionMask};
use async_trait::async_trait;
use thiserror::Error;

/// Native region descriptor submitted to the OS subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRequest {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f32,
    pub transitions: TransitionMask,
    pub initial_triggers: TransitionMask,
    pub expiration_ms: i64,
    pub loitering_delay_ms: i32,
    pub notification_responsiveness_ms: i32,
    pub dispatch_handle: DispatchHandle,
}

impl RegionRequest {
    /// Build the native descriptor from a definition, overriding the initial
    /// trigger mask (reboot replay passes an empty mask).
    pub fn from_definition(def: &GeofenceDefinition, initial_triggers: TransitionMask) -> Self {
        Self {
            id: def.id.clone(),
            latitude: def.latitude,
            longitude: def.longitude,
            radius_meters: def.radius_meters,
            transitions: def.transitions,
            initial_triggers,
            expiration_ms: def.expiration_ms,
            loitering_delay_ms: def.loitering_delay_ms,
            notification_responsiveness_ms: def.notification_responsiveness_ms,
            dispatch_handle: def.dispatch_handle,
        }
    }
}

/// Errors reported by the OS geofencing subsystem.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("OS subsystem rejected the request: {cause}")]
    Rejected { cause: String },

    #[error("OS subsystem is not tracking region {id:?}")]
    UnknownRegion { id: String },
}

/// OS Geofencing Subsystem interface
#[async_trait]
pub trait GeofencingBackend: Send + Sync {
    /// Whether the process currently holds the runtime location grant.
    /// Platforms without runtime grants return true unconditionally.
    fn has_location_permission(&self) -> bool;

    async fn add_region(&self, request: &RegionRequest) -> Result<(), BackendError>;

    async fn remove_regions(&self, ids: &[String]) -> Result<(), BackendError>;
}
