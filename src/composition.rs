//! Pipeline composition
//!
//! Wires the durable store, the OS backend, and the worker host into the
//! registry, coordinator, and recovery components. The embedding platform
//! layer holds one pipeline per process and routes its inbound signals
//! (method calls, OS callbacks, boot broadcast) to the matching component.

use crate::config::FencelineConfig;
use crate::dispatch::DispatchCoordinator;
use crate::error::StoreError;
use crate::platform::GeofencingBackend;
use crate::recovery::RebootRecovery;
use crate::registry::FenceRegistry;
use crate::store::{DurableStore, SledDurableStore};
use crate::worker::WorkerHost;
use std::sync::Arc;

/// The assembled geofence pipeline.
pub struct GeofencePipeline {
    registry: Arc<FenceRegistry>,
    coordinator: Arc<DispatchCoordinator>,
    recovery: RebootRecovery,
}

impl GeofencePipeline {
    /// Assemble a pipeline from injected collaborators.
    pub fn new(
        store: Arc<dyn DurableStore>,
        backend: Arc<dyn GeofencingBackend>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        let registry = Arc::new(FenceRegistry::new(Arc::clone(&store), backend));
        let coordinator = Arc::new(DispatchCoordinator::new(store, host));
        let recovery = RebootRecovery::new(Arc::clone(&registry));
        Self {
            registry,
            coordinator,
            recovery,
        }
    }

    /// Assemble a pipeline with a sled store at the configured path.
    pub fn open(
        config: &FencelineConfig,
        backend: Arc<dyn GeofencingBackend>,
        host: Arc<dyn WorkerHost>,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(SledDurableStore::new(&config.store_path)?);
        Ok(Self::new(store, backend, host))
    }

    pub fn registry(&self) -> &Arc<FenceRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &Arc<DispatchCoordinator> {
        &self.coordinator
    }

    pub fn recovery(&self) -> &RebootRecovery {
        &self.recovery
    }
}
