//! Test helpers para spice-control.

#![allow(dead_code, unused_imports)]

pub mod store;
pub mod transport;

pub use store::{RecordingStore, StoreCall};
pub use transport::{GatedTransport, server_response};

use std::future::Future;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Instala un subscriber de tracing para ver los logs con `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Espera hasta que `condition` sea verdadera, cediendo al scheduler.
/// Falla el test si no ocurre en 5 segundos.
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;

    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

/// Corre `fut` con un limite de 5 segundos.
pub async fn bounded<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("future did not resolve in time")
}
