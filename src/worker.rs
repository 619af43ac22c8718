//! Worker boundary
//!
//! The worker is an external execution context (isolate, service process)
//! spawned on demand from a persisted entrypoint handle. The host controls
//! its lifetime and OS priority; the worker itself only receives events.

use crate::error::DispatchError;
use crate::types::{DispatchHandle, TransitionEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// A running worker instance.
///
/// Delivery is fire-and-forget: the coordinator logs a delivery error and
/// moves on, it never retries or reorders.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn deliver(&self, event: &TransitionEvent) -> Result<(), DispatchError>;
}

/// Spawns workers and mediates OS priority requests for them.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Start a worker running the given entrypoint. The returned handle
    /// accepts deliveries once the worker has sent its initialized
    /// handshake; until then the coordinator buffers.
    async fn spawn(&self, entrypoint: DispatchHandle) -> Result<Arc<dyn Worker>, DispatchError>;

    /// Ask the OS to keep the worker alive with elevated priority.
    async fn promote_to_foreground(&self);

    /// Release the priority elevation.
    async fn demote_to_background(&self);
}
