//! Controller de cache read-through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use spice_core::{CacheEntry, Operation, Resource, SyncError, SyncResult};
use spice_store::KeyValueStore;
use tracing::{debug, warn};

use crate::flight::{Admission, FlightId, InFlightRegistry, Outcome, Vacancy};
use crate::keys::{CacheKey, KeyGenerator};
use crate::metrics::CacheMetrics;
use crate::mutation::{AutoInvalidationHandle, AutoInvalidator, MutationSource};
use crate::settings::ControllerSettings;
use crate::transport::{SyncOptions, Transport, TransportParams};

/// Coordina las lecturas entre la aplicación y el transport.
///
/// Persiste las lecturas exitosas bajo una key estable, coalesce las
/// lecturas concurrentes de una misma key en un único fetch y notifica a
/// todos los que esperan cuando ese fetch termina. Las operaciones que no
/// son lecturas pasan directo al transport.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use spice_control::{CacheController, SyncOptions, Transport};
/// use spice_core::Operation;
/// use spice_store::MemoryStore;
///
/// # async fn demo(transport: Arc<dyn Transport>) -> Result<(), spice_core::SyncError> {
/// let controller = CacheController::builder(transport)
///     .backend(Arc::new(MemoryStore::new()))
///     .build()?;
///
/// let payload = controller
///     .sync(Operation::Read, &"/users/1", SyncOptions::new())
///     .await?;
/// println!("{}", payload);
/// # Ok(())
/// # }
/// ```
pub struct CacheController {
    backend: Option<Arc<dyn KeyValueStore>>,
    key_generator: KeyGenerator,
    transport: Arc<dyn Transport>,
    registry: InFlightRegistry,
    fetch_timeout: Option<Duration>,
    metrics: CacheMetrics,
    auto_invalidation: Option<AutoInvalidationHandle>,
}

impl CacheController {
    /// Crea un builder con el transport dado.
    pub fn builder(transport: Arc<dyn Transport>) -> CacheControllerBuilder {
        CacheControllerBuilder::new(transport)
    }

    /// Genera la cache key para un resource y una operación.
    pub fn generate_key(&self, resource: &dyn Resource, operation: Operation) -> CacheKey {
        self.key_generator.generate(resource, operation)
    }

    /// Ejecuta `operation` sobre `resource`.
    ///
    /// Las lecturas pasan por el cache; create/update/delete se envian al
    /// transport sin modificar. La continuación que corresponda en `options`
    /// se invoca exactamente una vez y el mismo resultado se retorna.
    pub async fn sync(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        options: SyncOptions,
    ) -> SyncResult<Value> {
        let (params, continuations) = options.into_parts();

        let outcome = match operation {
            Operation::Read => self.read(resource, &params).await,
            Operation::Create | Operation::Update | Operation::Delete => {
                self.forward(operation, resource, &params).await
            },
        };

        continuations.deliver(&outcome);
        outcome
    }

    /// Lectura con cache: hit, miss o espera de un fetch en curso.
    async fn read(&self, resource: &dyn Resource, params: &TransportParams) -> Outcome {
        let store = self.store()?;
        let key = self.generate_key(resource, Operation::Read);
        let start = Instant::now();

        match self.registry.admit(&key, || self.probe(store, &key)) {
            Admission::Resolved(payload) => {
                self.metrics.record_hit();
                debug!(key = %key, "Cache hit");
                // Nunca entregar en el mismo poll: hit y miss se comportan igual
                tokio::task::yield_now().await;
                self.metrics
                    .record_operation_duration("read_hit", start.elapsed());
                Ok(payload)
            },
            Admission::Waiter(subscription) => {
                self.metrics.record_coalesced();
                debug!(
                    key = %key,
                    waiters = self.registry.waiter_count(&key),
                    "Fetch in flight, waiting for broadcast"
                );
                let outcome = subscription.outcome().await;
                self.metrics
                    .record_operation_duration("read_coalesced", start.elapsed());
                outcome
            },
            Admission::Initiator(flight) => {
                self.metrics.record_miss();
                self.metrics.update_in_flight(self.registry.in_flight());
                debug!(key = %key, flight = flight.get(), "Cache miss, fetching");
                let outcome = self.fetch(store, &key, flight, resource, params).await;
                self.metrics
                    .record_operation_duration("read_miss", start.elapsed());
                outcome
            },
        }
    }

    /// Consulta el store sin fetch en curso. Corre dentro del lock del
    /// registry: el placeholder queda escrito antes de que otro caller pueda
    /// mirar la misma key.
    fn probe(&self, store: &dyn KeyValueStore, key: &CacheKey) -> Vacancy<Value> {
        let raw = store.get(key.as_str()).unwrap_or_else(|e| {
            warn!(key = %key, store = store.name(), error = %e, "Store read failed, treating as miss");
            None
        });

        match CacheEntry::decode(raw.as_deref()) {
            Ok(CacheEntry::Result(payload)) => return Vacancy::Resolved(payload),
            Ok(CacheEntry::Placeholder) => {
                warn!(key = %key, "Stale placeholder without a live fetch, refetching");
            },
            Ok(CacheEntry::Absent) => {},
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache entry, treating as miss");
            },
        }

        if let Err(e) = store.set(key.as_str(), &CacheEntry::placeholder_envelope()) {
            warn!(key = %key, store = store.name(), error = %e, "Failed to write placeholder");
        }

        Vacancy::Claim
    }

    /// Corre el fetch de un miss y publica el resultado.
    async fn fetch(
        &self,
        store: &dyn KeyValueStore,
        key: &CacheKey,
        flight: FlightId,
        resource: &dyn Resource,
        params: &TransportParams,
    ) -> Outcome {
        let mut guard = FlightGuard {
            registry: &self.registry,
            metrics: &self.metrics,
            store,
            key,
            flight,
            armed: true,
        };

        let outcome = self.call_transport(key, resource, params).await;
        guard.armed = false;

        match &outcome {
            Ok(payload) => {
                if let Err(e) = store.set(key.as_str(), &CacheEntry::result_envelope(payload)) {
                    warn!(key = %key, store = store.name(), error = %e, "Failed to persist fetched result");
                    clear_placeholder(store, key);
                }
            },
            Err(e) => {
                let reason = if e.is_timeout() { "timeout" } else { "transport" };
                self.metrics.record_fetch_failure(reason);
                warn!(key = %key, error = %e, "Fetch failed, clearing placeholder");
                clear_placeholder(store, key);
            },
        }

        let notified = self.registry.complete(key, flight, &outcome).unwrap_or(0);
        self.metrics.update_in_flight(self.registry.in_flight());
        debug!(key = %key, notified, ok = outcome.is_ok(), "Fetch resolved");

        outcome
    }

    async fn call_transport(
        &self,
        key: &CacheKey,
        resource: &dyn Resource,
        params: &TransportParams,
    ) -> Outcome {
        let call = self.transport.execute(Operation::Read, resource, params);

        match self.fetch_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(result) => result.map_err(SyncError::from),
                Err(_) => Err(SyncError::fetch_timeout(key.as_str(), deadline_millis(deadline))),
            },
            None => call.await.map_err(SyncError::from),
        }
    }

    async fn forward(
        &self,
        operation: Operation,
        resource: &dyn Resource,
        params: &TransportParams,
    ) -> Outcome {
        debug!(
            operation = %operation,
            transport = self.transport.name(),
            "Forwarding to transport"
        );
        self.transport
            .execute(operation, resource, params)
            .await
            .map_err(SyncError::from)
    }

    /// Retorna el backend o falla si no fue configurado.
    pub(crate) fn store(&self) -> SyncResult<&dyn KeyValueStore> {
        self.backend.as_deref().ok_or_else(SyncError::missing_backend)
    }

    /// Retorna true si hay un fetch en curso para `key`.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.registry.is_in_flight(key)
    }

    /// Retorna el número de keys con fetch en curso.
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }

    /// Retorna el número de lecturas esperando el fetch de `key`.
    pub fn waiter_count(&self, key: &CacheKey) -> usize {
        self.registry.waiter_count(key)
    }

    /// Retorna el backend configurado.
    pub fn backend(&self) -> Option<&Arc<dyn KeyValueStore>> {
        self.backend.as_ref()
    }

    /// Retorna el generador de keys.
    pub fn key_generator(&self) -> &KeyGenerator {
        &self.key_generator
    }

    /// Retorna el deadline por fetch, si hay uno.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    /// Retorna true si la auto-invalidación está activa.
    pub fn auto_invalidates(&self) -> bool {
        self.auto_invalidation.is_some()
    }

    /// Retorna las métricas para acceso externo.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for CacheController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheController")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("key_generator", &self.key_generator)
            .field("transport", &self.transport.name())
            .field("in_flight", &self.registry.in_flight())
            .field("fetch_timeout", &self.fetch_timeout)
            .field("auto_invalidation", &self.auto_invalidation.is_some())
            .finish()
    }
}

/// Quita el placeholder de `key` si sigue ahí. Un valor distinto (por
/// ejemplo un resultado escrito por otra vía) se respeta.
fn clear_placeholder(store: &dyn KeyValueStore, key: &CacheKey) {
    let still_placeholder = match store.get(key.as_str()) {
        Ok(raw) => matches!(CacheEntry::decode(raw.as_deref()), Ok(CacheEntry::Placeholder)),
        Err(_) => true,
    };

    if still_placeholder && let Err(e) = store.remove(key.as_str()) {
        warn!(key = %key, store = store.name(), error = %e, "Failed to clear placeholder");
    }
}

/// Libera la key si el future del initiator se descarta antes de que el
/// fetch resuelva: limpia el placeholder y falla a los waiters.
struct FlightGuard<'a> {
    registry: &'a InFlightRegistry,
    metrics: &'a CacheMetrics,
    store: &'a dyn KeyValueStore,
    key: &'a CacheKey,
    flight: FlightId,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(key = %self.key, "Fetch abandoned before completing");
        clear_placeholder(self.store, self.key);
        let outcome = Err(SyncError::abandoned(self.key.as_str()));
        self.registry.complete(self.key, self.flight, &outcome);
        self.metrics.update_in_flight(self.registry.in_flight());
    }
}

/// Milisegundos del deadline, saturando en `u64::MAX`.
fn deadline_millis(deadline: Duration) -> u64 {
    u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX)
}

/// Builder para CacheController.
pub struct CacheControllerBuilder {
    transport: Arc<dyn Transport>,
    backend: Option<Arc<dyn KeyValueStore>>,
    key_generator: KeyGenerator,
    fetch_timeout: Option<Duration>,
    mutations: Option<MutationSource>,
}

impl CacheControllerBuilder {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            backend: None,
            key_generator: KeyGenerator::default(),
            fetch_timeout: None,
            mutations: None,
        }
    }

    /// Configura el backend key-value. Requerido para lecturas e invalidación.
    pub fn backend(mut self, backend: Arc<dyn KeyValueStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Reemplaza el generador de keys por defecto (el locator).
    pub fn key_generator(mut self, key_generator: KeyGenerator) -> Self {
        self.key_generator = key_generator;
        self
    }

    /// Falla el fetch (y a sus waiters) si el transport tarda más.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Invalida la key de lectura de cada resource publicado en `source`.
    pub fn auto_invalidate(mut self, source: &MutationSource) -> Self {
        self.mutations = Some(source.clone());
        self
    }

    /// Aplica los valores cargados de la configuración.
    pub fn settings(mut self, settings: &ControllerSettings) -> Self {
        if let Some(timeout) = settings.fetch_timeout() {
            self.fetch_timeout = Some(timeout);
        }
        self
    }

    /// Construye el controller.
    ///
    /// # Errors
    ///
    /// `SyncError::Configuration` si se pidió auto-invalidación sin backend o
    /// fuera de un runtime de Tokio. La falta de backend por sí sola se
    /// reporta recién en la primera operación de cache.
    pub fn build(self) -> SyncResult<CacheController> {
        let metrics = CacheMetrics::new();

        let auto_invalidation = match &self.mutations {
            None => None,
            Some(source) => {
                let store = self.backend.clone().ok_or_else(|| {
                    SyncError::configuration("auto-invalidation requires a key-value backend")
                })?;
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(SyncError::configuration(
                        "auto-invalidation must be started inside a Tokio runtime",
                    ));
                }
                let invalidator =
                    AutoInvalidator::new(store, self.key_generator.clone(), metrics.clone());
                Some(invalidator.start(source.subscribe()))
            },
        };

        Ok(CacheController {
            backend: self.backend,
            key_generator: self.key_generator,
            transport: self.transport,
            registry: InFlightRegistry::new(),
            fetch_timeout: self.fetch_timeout,
            metrics,
            auto_invalidation,
        })
    }
}
