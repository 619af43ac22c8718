//! Shared test utilities for integration tests
//!
//! Fake collaborators standing in for the OS geofencing subsystem, the
//! worker bootstrap mechanism, and a fault-injecting durable store.

use async_trait::async_trait;
use fenceline::dispatch::DispatchCoordinator;
use fenceline::error::{DispatchError, StoreError};
use fenceline::platform::{BackendError, GeofencingBackend, RegionRequest};
use fenceline::store::{DurableStore, SledDurableStore};
use fenceline::types::{
    BackendTransition, DispatchHandle, GeofenceDefinition, Location, TransitionEvent,
    TransitionMask, TransitionType,
};
use fenceline::worker::{Worker, WorkerHost};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fake OS geofencing subsystem tracking active region ids in memory.
pub struct FakeBackend {
    pub active: Mutex<BTreeSet<String>>,
    pub permission: AtomicBool,
    /// Ids whose add_region call is rejected.
    pub fail_ids: Mutex<BTreeSet<String>>,
    /// Every add_region call in order, including rejected ones.
    pub add_calls: Mutex<Vec<String>>,
    /// Initial trigger mask of every add_region call, same order.
    pub add_triggers: Mutex<Vec<TransitionMask>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(BTreeSet::new()),
            permission: AtomicBool::new(true),
            fail_ids: Mutex::new(BTreeSet::new()),
            add_calls: Mutex::new(Vec::new()),
            add_triggers: Mutex::new(Vec::new()),
        })
    }

    pub fn active_ids(&self) -> BTreeSet<String> {
        self.active.lock().clone()
    }
}

#[async_trait]
impl GeofencingBackend for FakeBackend {
    fn has_location_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    async fn add_region(&self, request: &RegionRequest) -> Result<(), BackendError> {
        self.add_calls.lock().push(request.id.clone());
        self.add_triggers.lock().push(request.initial_triggers);
        if self.fail_ids.lock().contains(&request.id) {
            return Err(BackendError::Rejected {
                cause: format!("synthetic rejection for {}", request.id),
            });
        }
        self.active.lock().insert(request.id.clone());
        Ok(())
    }

    async fn remove_regions(&self, ids: &[String]) -> Result<(), BackendError> {
        let mut active = self.active.lock();
        for id in ids {
            if !active.remove(id) {
                return Err(BackendError::UnknownRegion { id: id.clone() });
            }
        }
        Ok(())
    }
}

/// Fake worker recording every delivered event in order.
///
/// A re-entry payload, when set, is fed back into the coordinator on the
/// next delivery, which exercises the drain/ready boundary.
pub struct RecordingWorker {
    pub delivered: Mutex<Vec<TransitionEvent>>,
    reentry: Mutex<Option<(Arc<DispatchCoordinator>, BackendTransition)>>,
}

impl RecordingWorker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
            reentry: Mutex::new(None),
        })
    }

    pub fn delivered_sequences(&self) -> Vec<u64> {
        self.delivered.lock().iter().map(|e| e.sequence).collect()
    }

    pub fn inject_on_next_delivery(
        &self,
        coordinator: Arc<DispatchCoordinator>,
        raw: BackendTransition,
    ) {
        *self.reentry.lock() = Some((coordinator, raw));
    }
}

#[async_trait]
impl Worker for RecordingWorker {
    async fn deliver(&self, event: &TransitionEvent) -> Result<(), DispatchError> {
        self.delivered.lock().push(event.clone());
        let reentry = self.reentry.lock().take();
        if let Some((coordinator, raw)) = reentry {
            coordinator.on_transition(raw).await;
        }
        Ok(())
    }
}

/// Fake worker host handing out a shared RecordingWorker.
pub struct FakeWorkerHost {
    pub worker: Arc<RecordingWorker>,
    pub spawn_count: AtomicUsize,
    pub fail_next_spawn: AtomicBool,
    pub foreground: AtomicBool,
}

impl FakeWorkerHost {
    pub fn new(worker: Arc<RecordingWorker>) -> Arc<Self> {
        Arc::new(Self {
            worker,
            spawn_count: AtomicUsize::new(0),
            fail_next_spawn: AtomicBool::new(false),
            foreground: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl WorkerHost for FakeWorkerHost {
    async fn spawn(&self, _entrypoint: DispatchHandle) -> Result<Arc<dyn Worker>, DispatchError> {
        self.spawn_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_spawn.swap(false, Ordering::SeqCst) {
            return Err(DispatchError::WorkerStartFailed {
                cause: "synthetic spawn failure".to_string(),
            });
        }
        Ok(Arc::clone(&self.worker) as Arc<dyn Worker>)
    }

    async fn promote_to_foreground(&self) {
        self.foreground.store(true, Ordering::SeqCst);
    }

    async fn demote_to_background(&self) {
        self.foreground.store(false, Ordering::SeqCst);
    }
}

/// Sled-backed store with injectable put/delete failures.
pub struct FailingStore {
    inner: SledDurableStore,
    pub fail_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FailingStore {
    pub fn new(path: &std::path::Path) -> Arc<Self> {
        Arc::new(Self {
            inner: SledDurableStore::new(path).unwrap(),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        })
    }

    fn synthetic_failure(op: &str) -> StoreError {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("synthetic {} failure", op),
        ))
    }
}

impl DurableStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Self::synthetic_failure("put"));
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::synthetic_failure("delete"));
        }
        self.inner.delete(key)
    }

    fn get_set(&self, key: &str) -> Result<Option<BTreeSet<String>>, StoreError> {
        self.inner.get_set(key)
    }

    fn put_set(&self, key: &str, set: &BTreeSet<String>) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Self::synthetic_failure("put_set"));
        }
        self.inner.put_set(key, set)
    }
}

pub fn definition(id: &str) -> GeofenceDefinition {
    GeofenceDefinition {
        id: id.to_string(),
        latitude: 37.0,
        longitude: -122.0,
        radius_meters: 100.0,
        transitions: TransitionMask::ENTER,
        initial_triggers: TransitionMask::NONE,
        expiration_ms: -1,
        loitering_delay_ms: 0,
        notification_responsiveness_ms: 0,
        dispatch_handle: DispatchHandle(42),
    }
}

pub fn transition(fence_id: &str) -> BackendTransition {
    BackendTransition {
        dispatch_handle: DispatchHandle(42),
        fence_ids: vec![fence_id.to_string()],
        location: Location {
            latitude: 37.0,
            longitude: -122.0,
        },
        transition: TransitionType::Enter,
        error_code: None,
    }
}
