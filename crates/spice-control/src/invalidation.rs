//! Invalidación del cache, explícita y por patrón glob.

use glob::Pattern;
use spice_core::{Operation, Resource, SyncError, SyncResult};
use spice_store::KeyValueStore;
use tracing::{debug, info};

use crate::controller::CacheController;
use crate::keys::CacheKey;
use crate::metrics::CacheMetrics;

/// Resultado de una invalidación por patrón.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Número de entries invalidadas.
    pub count: usize,
    /// Patrones aplicados.
    pub patterns: Vec<String>,
}

/// Borra `key` del store. Nunca toca el registry in-flight: un fetch en curso
/// termina y escribe su resultado igual.
pub(crate) fn remove_key(
    store: &dyn KeyValueStore,
    key: &CacheKey,
    metrics: &CacheMetrics,
    trigger: &str,
) -> SyncResult<()> {
    store
        .remove(key.as_str())
        .map_err(|e| SyncError::store(store.name(), e.to_string()))?;
    metrics.record_invalidation(trigger);
    Ok(())
}

impl CacheController {
    /// Invalida la entrada de `resource` para `operation`.
    ///
    /// Una key ausente no es un error. Llamarla dos veces equivale a una.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use spice_control::{CacheController, Transport};
    /// # use spice_core::Operation;
    /// # use spice_store::MemoryStore;
    /// # fn demo(transport: Arc<dyn Transport>) -> Result<(), spice_core::SyncError> {
    /// # let controller = CacheController::builder(transport)
    /// #     .backend(Arc::new(MemoryStore::new()))
    /// #     .build()?;
    /// controller.invalidate(&"/users/1", Operation::Read)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn invalidate(&self, resource: &dyn Resource, operation: Operation) -> SyncResult<()> {
        let store = self.store()?;
        let key = self.generate_key(resource, operation);

        remove_key(store, &key, self.metrics(), "explicit")?;
        debug!(key = %key, operation = %operation, "Cache entry invalidated");
        Ok(())
    }

    /// Invalida todas las keys del store que coincidan con un patrón glob.
    ///
    /// - `*`: coincide con cualquier secuencia de caracteres
    /// - `?`: coincide con un carácter
    ///
    /// Un patrón inválido no invalida nada.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use spice_control::{CacheController, Transport};
    /// # use spice_store::MemoryStore;
    /// # fn demo(transport: Arc<dyn Transport>) -> Result<(), spice_core::SyncError> {
    /// # let controller = CacheController::builder(transport)
    /// #     .backend(Arc::new(MemoryStore::new()))
    /// #     .build()?;
    /// // Invalida todas las lecturas de usuarios
    /// let result = controller.invalidate_by_pattern("/users/*")?;
    /// println!("Invalidated {} entries", result.count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn invalidate_by_pattern(&self, pattern_str: &str) -> SyncResult<InvalidationResult> {
        let store = self.store()?;

        let pattern = match Pattern::new(pattern_str) {
            Ok(p) => p,
            Err(e) => {
                debug!(pattern = %pattern_str, error = %e, "Invalid glob pattern");
                return Ok(InvalidationResult {
                    count: 0,
                    patterns: vec![pattern_str.to_string()],
                });
            },
        };

        let keys = store
            .keys()
            .map_err(|e| SyncError::store(store.name(), e.to_string()))?;

        let mut count = 0;
        for key in keys.into_iter().filter(|k| pattern.matches(k)) {
            remove_key(store, &CacheKey::from(key), self.metrics(), "pattern")?;
            count += 1;
        }

        info!(
            pattern = %pattern_str,
            count = count,
            "Cache entries invalidated by pattern"
        );

        Ok(InvalidationResult {
            count,
            patterns: vec![pattern_str.to_string()],
        })
    }

    /// Invalida múltiples patrones a la vez.
    pub fn invalidate_by_patterns(&self, patterns: &[&str]) -> SyncResult<InvalidationResult> {
        let mut total_count = 0;
        let mut all_patterns = Vec::new();

        for pattern_str in patterns {
            let result = self.invalidate_by_pattern(pattern_str)?;
            total_count += result.count;
            all_patterns.extend(result.patterns);
        }

        Ok(InvalidationResult {
            count: total_count,
            patterns: all_patterns,
        })
    }
}
