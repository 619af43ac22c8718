//! Persistence layer for the Durable Store

use crate::error::StoreError;
use crate::store::DurableStore;
use bincode;
use sled;
use std::collections::BTreeSet;
use std::path::Path;

/// Sled-based implementation of DurableStore
pub struct SledDurableStore {
    db: sled::Db,
}

impl SledDurableStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush database: {}", e),
            ))
        })?;
        Ok(())
    }
}

impl DurableStore for SledDurableStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self.db.get(key.as_bytes()).map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to read key {:?}: {}", key, e),
            ))
        })?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), value).map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to write key {:?}: {}", key, e),
            ))
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove(key.as_bytes()).map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to delete key {:?}: {}", key, e),
            ))
        })?;
        Ok(())
    }

    fn get_set(&self, key: &str) -> Result<Option<BTreeSet<String>>, StoreError> {
        match self.get(key)? {
            Some(bytes) => {
                let set: BTreeSet<String> =
                    bincode::deserialize(&bytes).map_err(|e| StoreError::CorruptRecord {
                        key: key.to_string(),
                        reason: format!("Failed to deserialize id set: {}", e),
                    })?;
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    fn put_set(&self, key: &str, set: &BTreeSet<String>) -> Result<(), StoreError> {
        let bytes = bincode::serialize(set).map_err(|e| StoreError::CorruptRecord {
            key: key.to_string(),
            reason: format!("Failed to serialize id set: {}", e),
        })?;
        self.put(key, &bytes)
    }
}
