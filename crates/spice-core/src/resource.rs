//! Resource abstraction.

use std::sync::Arc;

/// A remote resource whose identity derives the cache key.
///
/// The only contract is a stable locator, typically the URL the transport
/// would hit for a read.
///
/// # Example
///
/// ```
/// use spice_core::Resource;
///
/// struct User {
///     id: u64,
/// }
///
/// impl Resource for User {
///     fn locator(&self) -> String {
///         format!("/users/{}", self.id)
///     }
/// }
///
/// assert_eq!(User { id: 7 }.locator(), "/users/7");
/// assert_eq!("theUrl".locator(), "theUrl");
/// ```
pub trait Resource: Send + Sync {
    /// Returns the stable locator of this resource.
    fn locator(&self) -> String;
}

impl Resource for str {
    fn locator(&self) -> String {
        self.to_string()
    }
}

impl Resource for String {
    fn locator(&self) -> String {
        self.clone()
    }
}

impl<T: Resource + ?Sized> Resource for &T {
    fn locator(&self) -> String {
        (**self).locator()
    }
}

impl<T: Resource + ?Sized> Resource for Arc<T> {
    fn locator(&self) -> String {
        (**self).locator()
    }
}

impl<T: Resource + ?Sized> Resource for Box<T> {
    fn locator(&self) -> String {
        (**self).locator()
    }
}
