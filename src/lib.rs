//! Fenceline: Durable Geofence Registration and Dispatch
//!
//! Coordination core for OS geofencing: fence registrations that survive
//! process death and device reboot, a cold-start dispatch state machine
//! that buffers transition events until the worker's initialized handshake
//! and then replays them in FIFO order exactly once, and reboot recovery
//! that re-registers every durable fence. The OS geofencing subsystem and
//! the worker bootstrap mechanism are injected collaborators.

pub mod composition;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod platform;
pub mod recovery;
pub mod registry;
pub mod store;
pub mod types;
pub mod worker;
