//! Key/value persistence behind a trait object.
//!
//! Components hold an optional [`StorageHandle`]; with no handle attached
//! they run fully in memory and every persistence call is a no-op. Load
//! failures are tolerant by design: a missing or unparseable record means
//! "start fresh", logged at warn level, never an error surfaced to the
//! caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Storage key for the block list / snapshot record.
pub const CONTEXT_KEY: &str = "tansu-context";
/// Storage key for the zone registry record.
pub const ZONES_KEY: &str = "tansu-zones";
/// Storage key for the edit history record.
pub const EDIT_HISTORY_KEY: &str = "tansu-edit-history";
/// Storage key for custom block type definitions.
pub const BLOCK_TYPES_KEY: &str = "tansu-block-types";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage backend: {0}")]
    Backend(String),
}

/// A string key/value store.
pub trait Storage: Send {
    /// Fetch the value for a key, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value under a key, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key, if present.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type StorageHandle = Arc<Mutex<dyn Storage>>;

/// In-memory backend, used in tests and as the default for embedders that
/// bring no persistence of their own.
#[derive(Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A fresh in-memory storage handle.
pub fn memory_storage() -> StorageHandle {
    Arc::new(Mutex::new(MemoryStorage::new()))
}

/// Read and deserialize a record, tolerating absence and parse failures.
///
/// Returns `None` (with a warning on parse failure) rather than erroring,
/// so a corrupt record degrades to a fresh start.
pub(crate) fn load_record<T: serde::de::DeserializeOwned>(
    storage: &StorageHandle,
    key: &str,
) -> Option<T> {
    let raw = {
        let guard = storage.lock().ok()?;
        guard.get(key)?
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, %err, "discarding unparseable stored record");
            None
        }
    }
}

/// Serialize and write a record, logging failures at warn level.
pub(crate) fn save_record<T: serde::Serialize>(storage: &StorageHandle, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(key, %err, "failed to serialize record");
            return;
        }
    };
    let Ok(mut guard) = storage.lock() else {
        tracing::warn!(key, "storage lock poisoned, skipping write");
        return;
    };
    if let Err(err) = guard.set(key, &json) {
        tracing::warn!(key, %err, "failed to persist record");
    }
}

// ============================================================================
// Tests
// ============================================================================
