//! Durable Store
//!
//! Key-value persistence for fence registrations and the dispatch target.
//! The registry is the only component that mutates fence records; the
//! coordinator reads the dispatch target at cold start.

pub mod persistence;

pub use persistence::SledDurableStore;

use crate::error::StoreError;
use crate::types::DispatchHandle;
use std::collections::BTreeSet;

/// Key holding the persisted dispatch target handle.
pub const DISPATCH_HANDLE_KEY: &str = "dispatch_handle";

/// Key holding the set of tracked fence ids.
pub const FENCE_IDS_KEY: &str = "fence_ids";

/// Key for a single fence record.
pub fn fence_key(id: &str) -> String {
    format!("fence/{}", id)
}

/// Durable Store interface
///
/// All methods are synchronous: the backing store is a fast local database,
/// not a network service. Implementations must be safe to call from
/// concurrent registry and coordinator paths.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Read a persisted string set, or None if the key is absent.
    fn get_set(&self, key: &str) -> Result<Option<BTreeSet<String>>, StoreError>;
    fn put_set(&self, key: &str, set: &BTreeSet<String>) -> Result<(), StoreError>;
}

/// Decode the persisted dispatch target, or None if never initialized.
pub fn read_dispatch_handle(store: &dyn DurableStore) -> Result<Option<DispatchHandle>, StoreError> {
    match store.get(DISPATCH_HANDLE_KEY)? {
        Some(bytes) => {
            let handle = bincode::deserialize(&bytes).map_err(|e| StoreError::CorruptRecord {
                key: DISPATCH_HANDLE_KEY.to_string(),
                reason: format!("Failed to deserialize dispatch handle: {}", e),
            })?;
            Ok(Some(handle))
        }
        None => Ok(None),
    }
}
