//! Core types for geofence registration and transition dispatch.

use serde::{Deserialize, Serialize};

/// Opaque handle selecting which worker entrypoint should process events.
///
/// Assigned by the embedding application, persisted so it survives process
/// death and device reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchHandle(pub i64);

impl DispatchHandle {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

/// Bitset of transition kinds a fence should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMask(pub u8);

impl TransitionMask {
    pub const NONE: TransitionMask = TransitionMask(0);
    pub const ENTER: TransitionMask = TransitionMask(0x1);
    pub const EXIT: TransitionMask = TransitionMask(0x2);
    pub const DWELL: TransitionMask = TransitionMask(0x4);

    pub fn contains(self, other: TransitionMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for TransitionMask {
    type Output = TransitionMask;

    fn bitor(self, rhs: TransitionMask) -> TransitionMask {
        TransitionMask(self.0 | rhs.0)
    }
}

/// A single transition kind, as reported by the OS subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionType {
    Enter,
    Exit,
    Dwell,
}

/// WGS84 coordinates of the location that triggered a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A circular region registration.
///
/// `initial_triggers` is consumed at registration time only; it is carried in
/// the persisted record but reboot replay always re-registers with an empty
/// initial trigger mask so no synthetic transitions fire on boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceDefinition {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f32,
    pub transitions: TransitionMask,
    pub initial_triggers: TransitionMask,
    /// Milliseconds until the OS expires the fence; -1 means never.
    pub expiration_ms: i64,
    pub loitering_delay_ms: i32,
    pub notification_responsiveness_ms: i32,
    pub dispatch_handle: DispatchHandle,
}

impl GeofenceDefinition {
    /// Structural validation applied before any OS call.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("fence id must be non-empty".to_string());
        }
        if !(self.radius_meters > 0.0) {
            return Err(format!(
                "fence {:?}: radius must be positive, got {}",
                self.id, self.radius_meters
            ));
        }
        if self.transitions.is_empty() {
            return Err(format!(
                "fence {:?}: transition mask must be non-zero",
                self.id
            ));
        }
        Ok(())
    }
}

/// A transition report as handed over by the OS geofencing subsystem.
///
/// `error_code` carries the subsystem's own error report; a report with an
/// error code or an empty fence list is malformed and never dispatched.
#[derive(Debug, Clone)]
pub struct BackendTransition {
    pub dispatch_handle: DispatchHandle,
    pub fence_ids: Vec<String>,
    pub location: Location,
    pub transition: TransitionType,
    pub error_code: Option<i32>,
}

/// A validated transition event flowing through the dispatch pipeline.
///
/// `sequence` records monotonic receipt order; ordering matters downstream,
/// wall-clock time does not. Never persisted beyond the in-memory queue.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub dispatch_handle: DispatchHandle,
    pub fence_ids: Vec<String>,
    pub location: Location,
    pub transition: TransitionType,
    pub sequence: u64,
}
