//! In-flight fetch registry and per-key completion broadcast.
//!
//! Every key with an outstanding fetch owns exactly one
//! [`CompletionBroadcaster`]. Callers that arrive while the fetch runs
//! subscribe to it instead of starting their own. Registration and firing
//! happen under the same lock, so a subscriber can never attach to a
//! broadcaster that already fired.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use spice_core::SyncError;
use tokio::sync::oneshot;

use crate::keys::CacheKey;

/// Outcome shared with every caller coalesced on one fetch.
pub type Outcome = Result<Value, SyncError>;

/// Identity of a single fetch. Distinguishes consecutive fetches for the
/// same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightId(u64);

impl FlightId {
    /// Returns the raw id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// One-shot delivery of a fetch outcome to the callers waiting on it.
#[derive(Debug)]
pub struct CompletionBroadcaster {
    flight: FlightId,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

impl CompletionBroadcaster {
    fn new(flight: FlightId) -> Self {
        Self {
            flight,
            waiters: Vec::new(),
        }
    }

    fn subscribe(&mut self) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    /// Sends `outcome` to every waiter in registration order and consumes
    /// the broadcaster. Returns how many waiters were still listening.
    fn fire(self, outcome: &Outcome) -> usize {
        self.waiters
            .into_iter()
            .filter_map(|tx| tx.send(outcome.clone()).ok())
            .count()
    }
}

/// A caller's place in line for a fetch someone else started.
#[derive(Debug)]
pub struct Subscription {
    key: CacheKey,
    rx: oneshot::Receiver<Outcome>,
}

impl Subscription {
    /// Waits for the fetch to resolve.
    ///
    /// If the broadcaster is dropped without firing, the fetch is reported as
    /// abandoned instead of hanging forever.
    pub async fn outcome(self) -> Outcome {
        let Self { key, rx } = self;
        rx.await
            .unwrap_or_else(|_| Err(SyncError::abandoned(key.as_str())))
    }

    /// The key this subscription waits on.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

/// Decision taken by the caller when no fetch is in flight for a key.
#[derive(Debug)]
pub enum Vacancy<T> {
    /// The caller resolved the request without a fetch (a cache hit).
    Resolved(T),
    /// The caller becomes the initiator of a new fetch.
    Claim,
}

/// Result of [`InFlightRegistry::admit`].
#[derive(Debug)]
pub enum Admission<T> {
    /// Resolved without fetching.
    Resolved(T),
    /// The caller must run the fetch and then call `complete`.
    Initiator(FlightId),
    /// A fetch is already running; wait on the subscription.
    Waiter(Subscription),
}

/// Process-local map of keys with an outstanding fetch.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    flights: Mutex<HashMap<CacheKey, CompletionBroadcaster>>,
    next_flight: AtomicU64,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic get-or-insert for `key`.
    ///
    /// If a fetch is in flight the caller is subscribed to it. Otherwise
    /// `on_vacant` runs while the registry is still locked, so whatever it
    /// does (probing the store, writing a placeholder) cannot interleave with
    /// another caller's admission.
    pub fn admit<T, F>(&self, key: &CacheKey, on_vacant: F) -> Admission<T>
    where
        F: FnOnce() -> Vacancy<T>,
    {
        let mut flights = self.flights.lock();

        if let Some(broadcaster) = flights.get_mut(key) {
            return Admission::Waiter(Subscription {
                key: key.clone(),
                rx: broadcaster.subscribe(),
            });
        }

        match on_vacant() {
            Vacancy::Resolved(value) => Admission::Resolved(value),
            Vacancy::Claim => {
                let flight = FlightId(self.next_flight.fetch_add(1, Ordering::Relaxed));
                flights.insert(key.clone(), CompletionBroadcaster::new(flight));
                Admission::Initiator(flight)
            },
        }
    }

    /// Resolves the fetch `flight` for `key` and notifies its waiters.
    ///
    /// Returns the number of waiters notified, or `None` if `flight` is not
    /// the fetch currently registered for `key` (already completed).
    pub fn complete(&self, key: &CacheKey, flight: FlightId, outcome: &Outcome) -> Option<usize> {
        let broadcaster = {
            let mut flights = self.flights.lock();
            match flights.get(key) {
                Some(current) if current.flight == flight => flights.remove(key),
                _ => None,
            }
        }?;

        Some(broadcaster.fire(outcome))
    }

    /// Returns true if a fetch is outstanding for `key`.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.flights.lock().contains_key(key)
    }

    /// Returns the number of keys with an outstanding fetch.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    /// Returns the number of callers waiting on `key`, excluding the
    /// initiator.
    pub fn waiter_count(&self, key: &CacheKey) -> usize {
        self.flights
            .lock()
            .get(key)
            .map(|b| b.waiters.len())
            .unwrap_or(0)
    }
}
