//! Dispatch Coordinator
//!
//! State machine that spawns the worker on the first delivered event,
//! buffers events until the worker's initialized handshake, then drains the
//! buffer in FIFO order and forwards live events directly.
//!
//! The phase, the queue, the worker handle, and the sequence counter live in
//! one state object behind one lock, so the drain-and-flip transition is
//! atomic with respect to enqueue: no event can land between "queue observed
//! empty" and "phase flips to ready". The lock is never held across an
//! await into the worker, the host, or the store.

pub mod queue;

pub use queue::EventQueue;

use crate::error::DispatchError;
use crate::store::{read_dispatch_handle, DurableStore};
use crate::types::{BackendTransition, TransitionEvent};
use crate::worker::{Worker, WorkerHost};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Worker lifecycle phase for the current process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No worker instance exists.
    Cold,
    /// Worker spawn requested; events buffer until the handshake.
    Starting,
    /// Handshake received; events forward directly.
    Ready,
}

struct CoordinatorState {
    phase: Phase,
    queue: EventQueue,
    worker: Option<Arc<dyn Worker>>,
    next_sequence: u64,
}

/// Dispatch Coordinator
///
/// One instance per process lifetime, collaborators injected.
pub struct DispatchCoordinator {
    store: Arc<dyn DurableStore>,
    host: Arc<dyn WorkerHost>,
    state: Mutex<CoordinatorState>,
}

impl DispatchCoordinator {
    pub fn new(store: Arc<dyn DurableStore>, host: Arc<dyn WorkerHost>) -> Self {
        Self {
            store,
            host,
            state: Mutex::new(CoordinatorState {
                phase: Phase::Cold,
                queue: EventQueue::new(),
                worker: None,
                next_sequence: 0,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Handle a raw transition report from the OS subsystem.
    ///
    /// Malformed reports (error code set, or no triggered fences) are
    /// dropped with a warning and never queued or forwarded. A report
    /// arriving while cold triggers the worker spawn; spawn failures are
    /// logged here, not surfaced: the OS delivery path has no caller to
    /// report to.
    ///
    /// Receipt order is defined by the `sequence` assigned under the state
    /// lock. In the ready phase delivery happens after unlocking (no lock
    /// is ever held across a worker call), so callers invoking this
    /// concurrently may interleave at the worker; callers needing strict
    /// delivery order must serialize their own calls, as the OS callback
    /// path does.
    pub async fn on_transition(&self, raw: BackendTransition) {
        if let Some(code) = raw.error_code {
            warn!(error_code = code, "Dropping transition report with OS error");
            return;
        }
        if raw.fence_ids.is_empty() {
            warn!("Dropping transition report with no triggered fences");
            return;
        }

        let needs_cold_start;
        let forward_to = {
            let mut state = self.state.lock();
            let event = TransitionEvent {
                dispatch_handle: raw.dispatch_handle,
                fence_ids: raw.fence_ids,
                location: raw.location,
                transition: raw.transition,
                sequence: state.next_sequence,
            };
            state.next_sequence += 1;

            match state.phase {
                Phase::Ready => {
                    needs_cold_start = false;
                    match &state.worker {
                        Some(worker) => Some((Arc::clone(worker), event)),
                        None => {
                            // Ready always carries a worker handle.
                            error!("Ready with no worker handle, dropping event");
                            None
                        }
                    }
                }
                Phase::Starting => {
                    state.queue.enqueue(event);
                    needs_cold_start = false;
                    None
                }
                Phase::Cold => {
                    state.queue.enqueue(event);
                    state.phase = Phase::Starting;
                    needs_cold_start = true;
                    None
                }
            }
        };

        if let Some((worker, event)) = forward_to {
            if let Err(e) = worker.deliver(&event).await {
                error!(sequence = event.sequence, error = %e, "Worker delivery failed");
            }
            return;
        }

        if needs_cold_start {
            if let Err(e) = self.cold_start().await {
                error!(error = %e, "Cold start failed");
            }
        }
    }

    /// Explicit start request: spawn the worker without waiting for an
    /// event. No-op if a spawn is already underway or complete.
    pub async fn start(&self) -> Result<(), DispatchError> {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Cold {
                return Ok(());
            }
            state.phase = Phase::Starting;
        }
        self.cold_start().await
    }

    /// Read the dispatch target and spawn the worker. Runs with the state
    /// already flipped to `Starting` so concurrent events buffer.
    async fn cold_start(&self) -> Result<(), DispatchError> {
        let handle = match read_dispatch_handle(&*self.store) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                // Initialize was never called. Not retried: a missing
                // configuration cannot be fixed by retrying. Pending events
                // are dropped.
                let mut state = self.state.lock();
                let dropped = state.queue.drain_all().len();
                state.phase = Phase::Cold;
                error!(dropped, "Dispatch target unset, dropping pending events");
                return Err(DispatchError::DispatchTargetUnset);
            }
            Err(e) => {
                // Store read failed; keep the queue so a later event can
                // retrigger the spawn.
                let mut state = self.state.lock();
                state.phase = Phase::Cold;
                return Err(DispatchError::Store(e));
            }
        };

        debug!(handle = handle.as_i64(), "Spawning worker");
        match self.host.spawn(handle).await {
            Ok(worker) => {
                let mut state = self.state.lock();
                state.worker = Some(worker);
                // Phase stays Starting until the worker's handshake.
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.phase = Phase::Cold;
                error!(error = %e, "Worker spawn failed, pending events retained");
                Err(e)
            }
        }
    }

    /// The worker's initialized handshake.
    ///
    /// Repeatedly drains the queue and forwards the batch in FIFO order;
    /// flips to ready only when the queue is observed empty under the same
    /// lock acquisition as the flip. Events enqueued while a batch is in
    /// flight are captured by the next iteration, so nothing is lost at the
    /// starting/ready boundary.
    pub async fn worker_initialized(&self) {
        loop {
            let (worker, batch) = {
                let mut state = self.state.lock();
                let Some(worker) = state.worker.clone() else {
                    warn!("Handshake received before any worker spawn, ignoring");
                    return;
                };
                if state.queue.is_empty() {
                    state.phase = Phase::Ready;
                    info!("Dispatch coordinator ready");
                    return;
                }
                (worker, state.queue.drain_all())
            };

            debug!(count = batch.len(), "Replaying buffered transition events");
            for event in &batch {
                if let Err(e) = worker.deliver(event).await {
                    error!(sequence = event.sequence, error = %e, "Worker delivery failed");
                }
            }
        }
    }

    /// Ask the OS to keep the worker alive with elevated priority.
    /// Valid once a worker exists; ignored with a warning while cold.
    pub async fn promote_to_foreground(&self) {
        if self.state.lock().worker.is_none() {
            warn!("Foreground promotion requested with no worker, ignoring");
            return;
        }
        self.host.promote_to_foreground().await;
    }

    /// Release the worker's priority elevation.
    pub async fn demote_to_background(&self) {
        if self.state.lock().worker.is_none() {
            warn!("Background demotion requested with no worker, ignoring");
            return;
        }
        self.host.demote_to_background().await;
    }
}
