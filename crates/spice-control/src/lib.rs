//! Spice Control - keyed single-flight read-through cache
//!
//! [`CacheController`] sits between the application's data-access calls and
//! a remote [`Transport`]:
//!
//! - successful reads are persisted under a stable [`CacheKey`]
//! - concurrent reads of one key while a fetch is outstanding share that
//!   fetch instead of starting their own
//! - everyone waiting on a fetch is notified exactly once when it resolves
//!
//! Writes (`create`, `update`, `delete`) are forwarded untouched.

pub mod controller;
pub mod flight;
pub mod invalidation;
pub mod keys;
pub mod metrics;
pub mod mutation;
pub mod settings;
pub mod transport;

// Re-exports
pub use controller::{CacheController, CacheControllerBuilder};
pub use flight::{CompletionBroadcaster, InFlightRegistry, Outcome};
pub use invalidation::InvalidationResult;
pub use keys::{CacheKey, KeyGenerator};
pub use metrics::{CacheMetrics, register_cache_metrics};
pub use mutation::{AutoInvalidationHandle, MutationEvent, MutationSource};
pub use settings::{ControllerSettings, SettingsError};
pub use transport::{SyncOptions, Transport, TransportParams};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }
}
