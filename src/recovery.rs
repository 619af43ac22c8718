//! Reboot Recovery
//!
//! The OS clears all geofence registrations on restart; the boot-completed
//! signal replays every durable registration back into the OS subsystem.

use crate::registry::FenceRegistry;
use std::sync::Arc;
use tracing::{error, info};

/// Consumes the boot-completed signal and replays persisted fences.
///
/// One bad entry never aborts the rest; a fence that fails to re-register
/// is simply absent until the application registers it again. No retries.
pub struct RebootRecovery {
    registry: Arc<FenceRegistry>,
}

impl RebootRecovery {
    pub fn new(registry: Arc<FenceRegistry>) -> Self {
        Self { registry }
    }

    /// Zero-argument trigger invoked on the OS boot-completed signal.
    /// Never panics the host process: a total replay failure is logged.
    pub async fn on_boot_completed(&self) {
        match self.registry.replay_all().await {
            Ok(count) => {
                info!(count, "Reboot recovery re-registered geofences");
            }
            Err(e) => {
                error!(error = %e, "Reboot recovery failed");
            }
        }
    }
}
