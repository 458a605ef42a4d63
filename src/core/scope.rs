//! Shared, read-only view of the adapter's backend configuration

use crate::core::client::ObjectClient;
use crate::core::options::OptionsHolder;
use crate::core::prefixer::PathPrefixer;

/// Everything a component needs to address the backend
///
/// Borrowed from the adapter for the duration of one operation; no component
/// mutates it.
pub struct StoreScope<'a, C: ?Sized> {
    pub client: &'a C,
    pub bucket: &'a str,
    pub prefixer: &'a PathPrefixer,
    pub options: &'a OptionsHolder,
}

impl<'a, C: ObjectClient + ?Sized> StoreScope<'a, C> {
    pub fn new(
        client: &'a C,
        bucket: &'a str,
        prefixer: &'a PathPrefixer,
        options: &'a OptionsHolder,
    ) -> Self {
        StoreScope {
            client,
            bucket,
            prefixer,
            options,
        }
    }
}

impl<C: ?Sized> Clone for StoreScope<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for StoreScope<'_, C> {}
