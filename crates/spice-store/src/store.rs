//! Key-value store trait definition.

use crate::error::StoreError;

/// A synchronous store of opaque string values.
///
/// The controller owns the encoding of what it writes; implementations never
/// interpret values. Calls are expected to be cheap and non-blocking enough to
/// run inside the controller's critical section.
///
/// # Implementors
///
/// - `MemoryStore` - Process-local, lost on restart
/// - `FileStore` - Persisted to a JSON document on disk
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::Mutex;
///
/// use spice_store::{KeyValueStore, StoreError};
///
/// #[derive(Default)]
/// struct MapStore(Mutex<HashMap<String, String>>);
///
/// impl KeyValueStore for MapStore {
///     fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
///         Ok(self.0.lock().unwrap().get(key).cloned())
///     }
///
///     fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
///         self.0.lock().unwrap().insert(key.to_string(), value.to_string());
///         Ok(())
///     }
///
///     fn remove(&self, key: &str) -> Result<(), StoreError> {
///         self.0.lock().unwrap().remove(key);
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "map"
///     }
/// }
/// ```
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Returns every stored key.
    ///
    /// Only pattern invalidation needs this. Stores that cannot enumerate
    /// their keys keep the default, which makes pattern invalidation a no-op.
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    /// Returns the name of this store.
    ///
    /// This is used for logging and identification purposes.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullStore;

    impl KeyValueStore for NullStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn test_default_keys_is_empty() {
        let store = NullStore;
        store.set("a", "1").unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn KeyValueStore> = Box::new(NullStore);
        assert_eq!(store.name(), "null");
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.remove("missing").is_ok());
    }
}
