//! Configuración del controller desde archivo y entorno.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use spice_store::{FileStore, KeyValueStore, MemoryStore, StoreError};
use thiserror::Error;
use tracing::info;

use crate::mutation::{DEFAULT_MUTATION_CAPACITY, MutationSource};

/// Error al cargar la configuración.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("cannot open configured store: {0}")]
    Store(#[from] StoreError),
}

/// Configuración del controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerSettings {
    /// Deadline por fetch en milisegundos (default: sin deadline)
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,
    /// Archivo del store durable (default: store en memoria)
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Eventos en buffer por listener de mutaciones (default: 64)
    #[serde(default = "default_mutation_capacity")]
    pub mutation_capacity: usize,
}

fn default_mutation_capacity() -> usize {
    DEFAULT_MUTATION_CAPACITY
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: None,
            store_path: None,
            mutation_capacity: DEFAULT_MUTATION_CAPACITY,
        }
    }
}

impl ControllerSettings {
    /// Prefijo de las variables de entorno (`SPICE__FETCH_TIMEOUT_MS`, ...).
    pub const ENV_PREFIX: &'static str = "SPICE";

    /// Carga la configuración: archivo opcional y luego variables de entorno,
    /// que tienen prioridad.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Self = builder
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        info!(
            fetch_timeout_ms = ?settings.fetch_timeout_ms,
            store_path = ?settings.store_path,
            "Controller settings loaded"
        );
        Ok(settings)
    }

    /// Retorna el deadline por fetch.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Abre el store configurado: archivo si hay `store_path`, memoria si no.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>, SettingsError> {
        match &self.store_path {
            Some(path) => Ok(Arc::new(FileStore::open(path)?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }

    /// Crea un feed de mutaciones con la capacidad configurada.
    pub fn mutation_source(&self) -> MutationSource {
        MutationSource::new(self.mutation_capacity)
    }
}
