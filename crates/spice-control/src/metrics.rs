//! Registro de métricas del cache.

use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registra las métricas del controller.
/// Llamar una vez al inicio, después de instalar el recorder.
pub fn register_cache_metrics() {
    metrics::describe_counter!("spice_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("spice_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "spice_cache_coalesced_total",
        "Reads that joined a fetch already in flight"
    );
    metrics::describe_counter!(
        "spice_cache_fetch_failures_total",
        "Fetches that resolved with an error"
    );
    metrics::describe_counter!(
        "spice_cache_invalidations_total",
        "Keys removed by explicit or automatic invalidation"
    );
    metrics::describe_gauge!("spice_cache_in_flight", "Keys with an outstanding fetch");
    metrics::describe_histogram!(
        "spice_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Recorder de métricas del cache.
/// Usa atomic counters internos para consultar sin recorder instalado.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    coalesced: Arc<AtomicU64>,
    fetch_failures: Arc<AtomicU64>,
    invalidations: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("spice_cache_hits_total").increment(1);
    }

    /// Registra un cache miss (una lectura que inicia un fetch)
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("spice_cache_misses_total").increment(1);
    }

    /// Registra una lectura coalescida con un fetch en curso
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
        counter!("spice_cache_coalesced_total").increment(1);
    }

    /// Registra un fetch fallido
    pub fn record_fetch_failure(&self, reason: &str) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        counter!("spice_cache_fetch_failures_total", "reason" => reason.to_string()).increment(1);
    }

    /// Registra una invalidación
    pub fn record_invalidation(&self, trigger: &str) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        counter!("spice_cache_invalidations_total", "trigger" => trigger.to_string())
            .increment(1);
    }

    /// Actualiza el gauge de fetches en curso
    pub fn update_in_flight(&self, count: usize) {
        self.in_flight.store(count as u64, Ordering::Relaxed);
        gauge!("spice_cache_in_flight").set(count as f64);
    }

    /// Registra la duración de una operación
    pub fn record_operation_duration(&self, operation: &str, duration: Duration) {
        histogram!(
            "spice_cache_operation_seconds",
            "operation" => operation.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Calcula hit rate (para logging/debugging).
    /// Las lecturas coalescidas no cuentan como hit ni como miss.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    /// Retorna el número de hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Retorna el número de misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Retorna el número de lecturas coalescidas
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Retorna el número de fetches fallidos
    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    /// Retorna el número de invalidaciones
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Retorna el último valor del gauge de fetches en curso
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics_hit_rate() {
        let metrics = CacheMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        let rate = metrics.hit_rate();
        assert!((rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_coalesced_does_not_affect_hit_rate() {
        let metrics = CacheMetrics::new();
        metrics.record_miss();
        metrics.record_coalesced();
        metrics.record_coalesced();

        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.coalesced(), 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = CacheMetrics::new();
        let clone = metrics.clone();

        clone.record_invalidation("explicit");
        clone.record_fetch_failure("transport");

        assert_eq!(metrics.invalidations(), 1);
        assert_eq!(metrics.fetch_failures(), 1);
    }

    #[test]
    fn test_register_without_recorder_is_noop() {
        register_cache_metrics();
        let metrics = CacheMetrics::new();
        metrics.update_in_flight(3);
        assert_eq!(metrics.in_flight(), 3);
    }
}
