//! Automatic invalidation driven by mutation events.

use std::sync::Arc;

use spice_core::{Operation, Resource};
use spice_store::KeyValueStore;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::invalidation::remove_key;
use crate::keys::KeyGenerator;
use crate::metrics::CacheMetrics;

/// Default number of events buffered per listener.
pub const DEFAULT_MUTATION_CAPACITY: usize = 64;

/// A resource was mutated and its cached reads are now stale.
#[derive(Clone)]
pub struct MutationEvent {
    resource: Arc<dyn Resource>,
    operation: Operation,
}

impl MutationEvent {
    /// Creates a new event.
    pub fn new(resource: Arc<dyn Resource>, operation: Operation) -> Self {
        Self {
            resource,
            operation,
        }
    }

    /// Returns the mutated resource.
    pub fn resource(&self) -> &dyn Resource {
        self.resource.as_ref()
    }

    /// Returns the operation that mutated it.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl std::fmt::Debug for MutationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEvent")
            .field("locator", &self.resource.locator())
            .field("operation", &self.operation)
            .finish()
    }
}

/// Feed of mutation events a controller can observe.
///
/// Cloning shares the feed. Publishing with no controller listening is not an
/// error.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use spice_control::MutationSource;
/// use spice_core::Operation;
///
/// let source = MutationSource::new(16);
/// let delivered = source.publish(Arc::new("/users/1".to_string()), Operation::Update);
/// assert_eq!(delivered, 0);
/// ```
#[derive(Clone)]
pub struct MutationSource {
    sender: broadcast::Sender<MutationEvent>,
    capacity: usize,
}

impl MutationSource {
    /// Creates a feed buffering up to `capacity` events per listener.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Returns how many events each listener can fall behind before lagging.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publishes a mutation. Returns the number of listeners that received it.
    pub fn publish(&self, resource: Arc<dyn Resource>, operation: Operation) -> usize {
        self.sender
            .send(MutationEvent::new(resource, operation))
            .unwrap_or(0)
    }

    /// Subscribes to the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MutationSource {
    fn default() -> Self {
        Self::new(DEFAULT_MUTATION_CAPACITY)
    }
}

impl std::fmt::Debug for MutationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationSource")
            .field("capacity", &self.capacity)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle for controlling a running auto-invalidation listener.
pub struct AutoInvalidationHandle {
    /// Sender to signal shutdown.
    shutdown_tx: watch::Sender<bool>,
}

impl AutoInvalidationHandle {
    /// Signals the listener to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for AutoInvalidationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background task removing the read key of every mutated resource.
pub(crate) struct AutoInvalidator {
    store: Arc<dyn KeyValueStore>,
    key_generator: KeyGenerator,
    metrics: CacheMetrics,
}

impl AutoInvalidator {
    pub(crate) fn new(
        store: Arc<dyn KeyValueStore>,
        key_generator: KeyGenerator,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            store,
            key_generator,
            metrics,
        }
    }

    /// Starts the listener on the current Tokio runtime.
    pub(crate) fn start(
        self,
        events: broadcast::Receiver<MutationEvent>,
    ) -> AutoInvalidationHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = AutoInvalidationHandle { shutdown_tx };

        tokio::spawn(self.run(events, shutdown_rx));

        handle
    }

    async fn run(
        self,
        mut events: broadcast::Receiver<MutationEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(store = self.store.name(), "Starting auto-invalidation listener");

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.handle(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Mutation feed lagged, some invalidations were missed");
                    },
                    Err(RecvError::Closed) => {
                        info!("Mutation feed closed, auto-invalidation stopping");
                        break;
                    },
                },
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Auto-invalidation listener shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Cached data lives under the read key, whatever the mutation was.
    fn handle(&self, event: &MutationEvent) {
        let key = self.key_generator.generate(event.resource(), Operation::Read);

        match remove_key(self.store.as_ref(), &key, &self.metrics, "auto") {
            Ok(()) => debug!(key = %key, operation = %event.operation(), "Auto-invalidated"),
            Err(e) => warn!(key = %key, error = %e, "Auto-invalidation failed"),
        }
    }
}
