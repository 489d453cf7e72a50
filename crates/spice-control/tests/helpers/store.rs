//! Store that records every call.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use spice_store::{KeyValueStore, MemoryStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get(String),
    Set(String, String),
    Remove(String),
}

/// Wraps a `MemoryStore` and keeps a log of calls for assertions.
///
/// Failures can be injected per call kind; failed calls are still logged.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    log: Mutex<Vec<StoreCall>>,
    failing_gets: AtomicBool,
    failing_sets: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a value without recording it.
    pub fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value).unwrap();
    }

    /// Reads a value without recording it.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.log.lock().clone()
    }

    pub fn sets(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Set(k, v) => Some((k, v)),
                _ => None,
            })
            .collect()
    }

    pub fn removes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Remove(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    /// Every `get` fails from now on.
    pub fn fail_gets(&self) {
        self.failing_gets.store(true, Ordering::SeqCst);
    }

    /// Every `set` whose value contains `marker` fails from now on.
    pub fn fail_sets_containing(&self, marker: &str) {
        self.failing_sets.lock().push(marker.to_string());
    }

    fn injected(call: &str) -> StoreError {
        StoreError::Io(io::Error::other(format!("injected {} failure", call)))
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.log.lock().push(StoreCall::Get(key.to_string()));
        if self.failing_gets.load(Ordering::SeqCst) {
            return Err(Self::injected("get"));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.log
            .lock()
            .push(StoreCall::Set(key.to_string(), value.to_string()));
        if self
            .failing_sets
            .lock()
            .iter()
            .any(|marker| value.contains(marker.as_str()))
        {
            return Err(Self::injected("set"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.log.lock().push(StoreCall::Remove(key.to_string()));
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }

    fn name(&self) -> &str {
        "recording"
    }
}
