//! Generación de cache keys.

use std::fmt;
use std::sync::Arc;

use spice_core::{Operation, Resource};

/// Key única para cache de lecturas.
/// Identifica un par (resource, operation) en el store y en el registro in-flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Crea una cache key a partir de cualquier string.
    ///
    /// # Examples
    ///
    /// ```
    /// use spice_control::CacheKey;
    ///
    /// let key = CacheKey::new("theUrl");
    /// assert_eq!(key.as_str(), "theUrl");
    /// ```
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Retorna la key como string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Firma de un generador de keys personalizado.
pub type KeyFn = dyn Fn(&dyn Resource, Operation) -> String + Send + Sync;

/// Deriva la cache key de un resource.
///
/// Por defecto usa el locator del resource e ignora la operación.
#[derive(Clone, Default)]
pub enum KeyGenerator {
    /// La key es el locator del resource.
    #[default]
    Locator,
    /// Función provista al construir el controller.
    Custom(Arc<KeyFn>),
}

impl KeyGenerator {
    /// Crea un generador a partir de una función.
    ///
    /// # Examples
    ///
    /// ```
    /// use spice_control::KeyGenerator;
    /// use spice_core::Operation;
    ///
    /// let keys = KeyGenerator::custom(|resource, op| format!("{}#{}", resource.locator(), op));
    /// assert_eq!(keys.generate(&"theUrl", Operation::Read).as_str(), "theUrl#read");
    /// ```
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn Resource, Operation) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Genera la key para el resource y la operación. Función pura.
    pub fn generate(&self, resource: &dyn Resource, operation: Operation) -> CacheKey {
        match self {
            Self::Locator => CacheKey(resource.locator()),
            Self::Custom(f) => CacheKey(f(resource, operation)),
        }
    }

    /// Retorna true si es el generador por defecto.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Locator)
    }
}

impl fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locator => f.write_str("KeyGenerator::Locator"),
            Self::Custom(_) => f.write_str("KeyGenerator::Custom(..)"),
        }
    }
}
