//! Fence Registry
//!
//! Owns the set of active geofence registrations. Mediates add/remove
//! against the OS subsystem and the durable snapshot, with one hard
//! invariant: the snapshot is written only after the OS confirms, so the
//! store and the OS never disagree about which fences exist.

use crate::error::{RegistryError, StoreError};
use crate::platform::{BackendError, GeofencingBackend, RegionRequest};
use crate::store::{fence_key, DurableStore, DISPATCH_HANDLE_KEY, FENCE_IDS_KEY};
use crate::types::{DispatchHandle, GeofenceDefinition, TransitionMask};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The persisted snapshot: tracked-id set plus one record per fence.
///
/// Every read-modify-write of the id set and the paired record happens
/// through one of these methods while the registry holds the snapshot lock,
/// so the set and the mapping can never disagree.
struct Snapshot {
    store: Arc<dyn DurableStore>,
}

impl Snapshot {
    // The tracked-id set is the commit point: the record write (or delete)
    // happens first, so a store failure leaves the fence fully visible or
    // fully absent, never half-tracked.

    fn insert(&mut self, def: &GeofenceDefinition) -> Result<(), StoreError> {
        let record = bincode::serialize(def).map_err(|e| StoreError::CorruptRecord {
            key: fence_key(&def.id),
            reason: format!("Failed to serialize fence record: {}", e),
        })?;
        self.store.put(&fence_key(&def.id), &record)?;
        let mut ids = self.store.get_set(FENCE_IDS_KEY)?.unwrap_or_default();
        ids.insert(def.id.clone());
        self.store.put_set(FENCE_IDS_KEY, &ids)
    }

    fn remove(&mut self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&fence_key(id))?;
        let mut ids = self.store.get_set(FENCE_IDS_KEY)?.unwrap_or_default();
        ids.remove(id);
        self.store.put_set(FENCE_IDS_KEY, &ids)
    }

    fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let ids = self.store.get_set(FENCE_IDS_KEY)?.unwrap_or_default();
        Ok(ids.contains(id))
    }

    /// Read every tracked definition. A record that fails to decode is
    /// skipped with a warning so one corrupt entry cannot block replay.
    fn all(&self) -> Result<Vec<GeofenceDefinition>, StoreError> {
        let ids = self.store.get_set(FENCE_IDS_KEY)?.unwrap_or_default();
        let mut defs = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(bytes) = self.store.get(&fence_key(id))? else {
                warn!(fence_id = %id, "Tracked fence id has no stored record, skipping");
                continue;
            };
            match bincode::deserialize::<GeofenceDefinition>(&bytes) {
                Ok(def) => defs.push(def),
                Err(e) => {
                    warn!(fence_id = %id, error = %e, "Corrupt fence record, skipping");
                }
            }
        }
        Ok(defs)
    }
}

/// Fence Registry
///
/// OS registration calls for different ids may run concurrently; only the
/// persistence side effects serialize behind the snapshot lock. The lock is
/// never held across a call into the backend.
pub struct FenceRegistry {
    store: Arc<dyn DurableStore>,
    backend: Arc<dyn GeofencingBackend>,
    snapshot: Mutex<Snapshot>,
}

impl FenceRegistry {
    pub fn new(store: Arc<dyn DurableStore>, backend: Arc<dyn GeofencingBackend>) -> Self {
        let snapshot = Mutex::new(Snapshot {
            store: Arc::clone(&store),
        });
        Self {
            store,
            backend,
            snapshot,
        }
    }

    /// Record the dispatch target. Must be called before any registration;
    /// idempotent, last write wins.
    pub fn initialize(&self, handle: DispatchHandle) -> Result<(), RegistryError> {
        let bytes = bincode::serialize(&handle).map_err(|e| StoreError::CorruptRecord {
            key: DISPATCH_HANDLE_KEY.to_string(),
            reason: format!("Failed to serialize dispatch handle: {}", e),
        })?;
        self.store.put(DISPATCH_HANDLE_KEY, &bytes)?;
        info!(handle = handle.as_i64(), "Dispatch target initialized");
        Ok(())
    }

    /// Read the persisted dispatch target, if any.
    pub fn dispatch_target(&self) -> Result<Option<DispatchHandle>, RegistryError> {
        Ok(crate::store::read_dispatch_handle(&*self.store)?)
    }

    /// Register a fence with the OS subsystem and, when `persist` is set,
    /// add it to the durable snapshot.
    ///
    /// The snapshot is written only after the OS confirms: a failed OS call
    /// leaves no trace in the store, and an OS success followed by a store
    /// failure surfaces as [`RegistryError::StorePersistFailed`] while the
    /// OS-side registration stands. Re-registering an active id overwrites
    /// it.
    pub async fn register(
        &self,
        def: &GeofenceDefinition,
        persist: bool,
    ) -> Result<(), RegistryError> {
        self.register_with_triggers(def, def.initial_triggers, persist)
            .await
    }

    async fn register_with_triggers(
        &self,
        def: &GeofenceDefinition,
        initial_triggers: TransitionMask,
        persist: bool,
    ) -> Result<(), RegistryError> {
        def.validate().map_err(RegistryError::InvalidDefinition)?;

        if !self.backend.has_location_permission() {
            warn!(fence_id = %def.id, "Registration requires the location permission");
            return Err(RegistryError::PermissionDenied);
        }

        let request = RegionRequest::from_definition(def, initial_triggers);
        self.backend
            .add_region(&request)
            .await
            .map_err(|e| RegistryError::OsRegistrationFailed {
                cause: e.to_string(),
            })?;

        info!(fence_id = %def.id, "Registered geofence with OS subsystem");

        if persist {
            let mut snapshot = self.snapshot.lock();
            snapshot
                .insert(def)
                .map_err(|source| RegistryError::StorePersistFailed {
                    id: def.id.clone(),
                    source,
                })?;
            debug!(fence_id = %def.id, "Fence persisted to snapshot");
        }

        Ok(())
    }

    /// De-register a fence from the OS subsystem and evict it from the
    /// snapshot.
    ///
    /// If the OS is not tracking the id, the stale snapshot entry (if any)
    /// is still evicted and `NotFound` is returned. If the OS removal
    /// succeeds but the store eviction fails, the entry stays visible and
    /// `StorePersistFailed` is returned; the store write governs the
    /// visible state.
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let ids = [id.to_string()];
        match self.backend.remove_regions(&ids).await {
            Ok(()) => {}
            Err(BackendError::UnknownRegion { .. }) => {
                warn!(fence_id = %id, "OS subsystem has no active region for fence");
                let mut snapshot = self.snapshot.lock();
                if snapshot.contains(id)? {
                    warn!(fence_id = %id, "Evicting stale snapshot entry");
                    snapshot.remove(id)?;
                }
                return Err(RegistryError::NotFound(id.to_string()));
            }
            Err(e) => {
                return Err(RegistryError::OsRegistrationFailed {
                    cause: e.to_string(),
                });
            }
        }

        let mut snapshot = self.snapshot.lock();
        snapshot
            .remove(id)
            .map_err(|source| RegistryError::StorePersistFailed {
                id: id.to_string(),
                source,
            })?;
        info!(fence_id = %id, "Removed geofence");
        Ok(())
    }

    /// Current contents of the persisted snapshot.
    pub fn persisted_fences(&self) -> Result<Vec<GeofenceDefinition>, RegistryError> {
        Ok(self.snapshot.lock().all()?)
    }

    /// Re-register every persisted fence with the OS subsystem.
    ///
    /// Used by reboot recovery. Entries are read in one snapshot pass, then
    /// registered without the lock held and with `persist = false` (they are
    /// already durable) and an empty initial trigger mask (no synthetic
    /// transitions on boot). Each failure is logged and skipped; returns the
    /// number of successful re-registrations.
    pub async fn replay_all(&self) -> Result<usize, RegistryError> {
        let defs = self.snapshot.lock().all()?;
        let total = defs.len();
        let mut replayed = 0;
        for def in &defs {
            match self
                .register_with_triggers(def, TransitionMask::NONE, false)
                .await
            {
                Ok(()) => replayed += 1,
                Err(e) => {
                    error!(fence_id = %def.id, error = %e, "Failed to replay geofence");
                }
            }
        }
        info!(replayed, total, "Geofence replay complete");
        Ok(replayed)
    }
}
