//! Event Queue
//!
//! Strict FIFO buffer for transition events that arrive before the worker
//! has finished initializing. Unbounded: the OS delivers events rarely
//! relative to worker startup, so no backpressure policy is needed.
//!
//! The queue has no interior locking. The coordinator holds the single lock
//! that makes `enqueue` and the drain-and-flip transition atomic with
//! respect to each other; nothing else may touch the queue.

use crate::types::TransitionEvent;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<TransitionEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Append an event. Never blocks, never drops.
    pub fn enqueue(&mut self, event: TransitionEvent) {
        self.events.push_back(event);
    }

    /// Remove and return every queued event in arrival order.
    pub fn drain_all(&mut self) -> Vec<TransitionEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
