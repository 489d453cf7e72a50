//! # Spice Store
//!
//! Key-value backends for the Spice read-through cache.
//!
//! The controller only needs a synchronous `get`/`set`/`remove` over opaque
//! string values. This crate defines that contract and ships two backends:
//!
//! - [`MemoryStore`] - process-local, backed by an unbounded Moka cache
//! - [`FileStore`] - a JSON document on disk that survives restarts
//!
//! ## Example
//!
//! ```
//! use spice_store::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("theUrl", r#"{"data":1}"#)?;
//! assert_eq!(store.get("theUrl")?.as_deref(), Some(r#"{"data":1}"#));
//! # Ok::<(), spice_store::StoreError>(())
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

// Re-exports
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;

// Re-export spice_core for consumers
pub use spice_core;
