//! Error types for Spice.
//!
//! This module defines the error hierarchy shared by the controller and its
//! collaborators. All errors implement the standard `std::error::Error`
//! trait via `thiserror`.
//!
//! # Error Handling Philosophy
//!
//! - [`TransportError`] comes from the remote transport and is forwarded
//!   verbatim to every caller coalesced on the failed fetch.
//! - [`DecodeError`] describes an unreadable stored value. The controller
//!   never surfaces it; a corrupt entry is simply a cache miss.
//! - [`SyncError`] is what a `sync` or `invalidate` call resolves to. It is
//!   `Clone` because one outcome is broadcast to many waiters.
//!
//! # Example
//!
//! ```
//! use spice_core::{SyncError, SyncResult, TransportError};
//!
//! fn fetch(ok: bool) -> SyncResult<u32> {
//!     if !ok {
//!         return Err(TransportError::status(503, "maintenance").into());
//!     }
//!     Ok(42)
//! }
//!
//! assert!(fetch(false).unwrap_err().is_transport_error());
//! ```

use thiserror::Error;

/// Error reported by the remote transport for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote endpoint could not be reached.
    #[error("transport unavailable: {reason}")]
    Unavailable {
        /// Why the endpoint was unreachable
        reason: String,
    },

    /// The remote endpoint answered with a failure status.
    #[error("remote returned status {status}: {message}")]
    Status {
        /// Status code reported by the remote
        status: u16,
        /// Message accompanying the status
        message: String,
    },

    /// Any other transport failure.
    #[error("transport failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Creates an Unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a Status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates an Other error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Error decoding a value read back from the key-value store.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stored value is not valid JSON.
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored value is JSON but not a known envelope.
    #[error("stored value has an unknown shape: {0}")]
    UnknownShape(String),
}

/// Outcome error of a controller operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The transport failed; forwarded verbatim.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The controller is missing required configuration.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is missing or invalid
        reason: String,
    },

    /// The key-value store rejected an explicit operation.
    #[error("store '{store}' failed: {message}")]
    Store {
        /// Name of the failing store
        store: String,
        /// Description of the failure
        message: String,
    },

    /// The fetch for a key exceeded its deadline.
    #[error("fetch for key '{key}' timed out after {millis}ms")]
    FetchTimeout {
        /// The cache key whose fetch timed out
        key: String,
        /// The deadline that elapsed
        millis: u64,
    },

    /// The initiating call went away before the fetch resolved.
    #[error("fetch for key '{key}' was abandoned before completing")]
    Abandoned {
        /// The cache key whose fetch was abandoned
        key: String,
    },
}

impl SyncError {
    // ============================================
    // Convenience constructors
    // ============================================

    /// Creates a Configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates the error returned when no backend was configured.
    ///
    /// # Example
    ///
    /// ```
    /// use spice_core::SyncError;
    ///
    /// let error = SyncError::missing_backend();
    /// assert!(error.is_configuration_error());
    /// ```
    pub fn missing_backend() -> Self {
        Self::configuration("a key-value backend is required for cache operations")
    }

    /// Creates a Store error.
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Creates a FetchTimeout error.
    pub fn fetch_timeout(key: impl Into<String>, millis: u64) -> Self {
        Self::FetchTimeout {
            key: key.into(),
            millis,
        }
    }

    /// Creates an Abandoned error.
    pub fn abandoned(key: impl Into<String>) -> Self {
        Self::Abandoned { key: key.into() }
    }

    // ============================================
    // Query methods
    // ============================================

    /// Returns true if the transport produced this error.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns true if this is a store error.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Returns true if the fetch hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. })
    }

    /// Returns the transport error, if this wraps one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Type alias for Results with SyncError.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
