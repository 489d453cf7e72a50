//! Process-local store using Moka.

use moka::sync::Cache;
use tracing::trace;

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// In-memory key-value store.
///
/// Backed by a Moka cache built without capacity, TTL or TTI, so entries are
/// only ever removed explicitly. Cloning shares the underlying storage.
///
/// # Examples
///
/// ```
/// use spice_store::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("theUrl", "value").unwrap();
/// store.remove("theUrl").unwrap();
/// assert!(store.get("theUrl").unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().name("spice-memory-store").build(),
        }
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.iter().count()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        trace!(key = %key, bytes = value.len(), "memory store set");
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        trace!(key = %key, "memory store remove");
        self.inner.invalidate(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.iter().map(|(key, _)| (*key).clone()).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
