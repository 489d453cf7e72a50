//! Spice Core - Domain types and traits
//!
//! This crate provides the foundational types shared by the Spice cache
//! controller and its key-value backends: the operation kinds, the resource
//! abstraction, the stored entry envelope and the error taxonomy.

pub mod entry;
pub mod error;
pub mod operation;
pub mod resource;

pub use entry::CacheEntry;
pub use error::{DecodeError, SyncError, SyncResult, TransportError};
pub use operation::Operation;
pub use resource::Resource;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
