//! Scripted transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use spice_control::{Transport, TransportParams};
use spice_core::{Operation, Resource, TransportError};
use spice_store::KeyValueStore;
use tokio::sync::Semaphore;

/// The response every scripted fetch returns unless told otherwise.
pub fn server_response() -> Value {
    json!({"myResponse": true})
}

/// Transport whose calls block until the test releases them.
///
/// Records every call and, when observing a store, what the store held under
/// the resource locator at the moment the call started.
pub struct GatedTransport {
    gated: bool,
    gate: Semaphore,
    calls: AtomicUsize,
    log: Mutex<Vec<(Operation, String, TransportParams)>>,
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    observed_store: Option<Arc<dyn KeyValueStore>>,
    observed: Mutex<Vec<Option<String>>>,
}

impl GatedTransport {
    /// Calls resolve as soon as they are made.
    pub fn immediate() -> Self {
        Self::build(false)
    }

    /// Calls wait for [`GatedTransport::release`].
    pub fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        Self {
            gated,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            observed_store: None,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Records the store value at the start of every call.
    pub fn observing(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.observed_store = Some(store);
        self
    }

    /// Queues the result of the next unanswered call.
    pub fn respond_with(&self, result: Result<Value, TransportError>) {
        self.responses.lock().push_back(result);
    }

    /// Lets `n` blocked calls proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(Operation, String)> {
        self.log
            .lock()
            .iter()
            .map(|(op, locator, _)| (*op, locator.clone()))
            .collect()
    }

    pub fn last_params(&self) -> Option<TransportParams> {
        self.log.lock().last().map(|(_, _, params)| params.clone())
    }

    pub fn observed(&self) -> Vec<Option<String>> {
        self.observed.lock().clone()
    }

    /// Waits until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        super::wait_until("transport calls", || self.call_count() >= n).await;
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn execute(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        params: &TransportParams,
    ) -> Result<Value, TransportError> {
        let locator = resource.locator();

        if let Some(store) = &self.observed_store {
            self.observed
                .lock()
                .push(store.get(&locator).expect("observed store failed"));
        }
        self.log.lock().push((operation, locator, params.clone()));
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.gated {
            self.gate.acquire().await.expect("gate closed").forget();
        }

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(server_response()))
    }

    fn name(&self) -> &str {
        "gated"
    }
}
