//! Transport trait and per-call options.

use async_trait::async_trait;
use serde_json::{Map, Value};
use spice_core::{Operation, Resource, SyncError, TransportError};

/// Transport-specific parameters passed through unmodified.
pub type TransportParams = Map<String, Value>;

/// Continuation invoked with the payload of a successful call.
pub type SuccessFn = Box<dyn FnOnce(&Value) + Send>;

/// Continuation invoked with the error of a failed call.
pub type ErrorFn = Box<dyn FnOnce(&SyncError) + Send>;

/// The remote side that actually performs reads and writes.
///
/// The controller never inspects what the transport does; it only
/// intercepts successful reads to persist and broadcast them.
///
/// # Example
///
/// ```ignore
/// use spice_control::{Transport, TransportParams};
///
/// struct HttpTransport { client: reqwest::Client }
///
/// #[async_trait]
/// impl Transport for HttpTransport {
///     async fn execute(
///         &self,
///         operation: Operation,
///         resource: &dyn Resource,
///         params: &TransportParams,
///     ) -> Result<Value, TransportError> {
///         // Implementation here
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs `operation` against `resource`.
    ///
    /// Resolving the future is the single completion signal: exactly one of
    /// a payload or an error is produced, exactly once.
    async fn execute(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        params: &TransportParams,
    ) -> Result<Value, TransportError>;

    /// Returns the name of this transport.
    ///
    /// This is used for logging and identification purposes.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Options for a single `sync` call.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use spice_control::SyncOptions;
///
/// let options = SyncOptions::new()
///     .param("include", json!("owner"))
///     .on_success(|payload| println!("got {}", payload))
///     .on_error(|err| eprintln!("failed: {}", err));
///
/// assert_eq!(options.params()["include"], "owner");
/// ```
#[derive(Default)]
pub struct SyncOptions {
    params: TransportParams,
    success: Option<SuccessFn>,
    error: Option<ErrorFn>,
}

impl SyncOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single transport parameter.
    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Replaces all transport parameters.
    pub fn params_from(mut self, params: TransportParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the success continuation.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Value) + Send + 'static,
    {
        self.success = Some(Box::new(f));
        self
    }

    /// Sets the error continuation.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&SyncError) + Send + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }

    /// Returns the transport parameters.
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (TransportParams, Continuations) {
        (
            self.params,
            Continuations {
                success: self.success,
                error: self.error,
            },
        )
    }
}

impl std::fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("params", &self.params)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// The caller's continuations, split from the parameters so the parameters
/// can be borrowed by the transport while these wait for the outcome.
pub(crate) struct Continuations {
    success: Option<SuccessFn>,
    error: Option<ErrorFn>,
}

impl Continuations {
    /// Invokes the continuation matching `outcome`. Consumes self, so each
    /// call delivers at most once.
    pub(crate) fn deliver(self, outcome: &Result<Value, SyncError>) {
        match outcome {
            Ok(payload) => {
                if let Some(success) = self.success {
                    success(payload);
                }
            },
            Err(error) => {
                if let Some(on_error) = self.error {
                    on_error(error);
                }
            },
        }
    }
}
