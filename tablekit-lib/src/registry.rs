//! Per-page widget registry
//!
//! One [`WidgetRegistry`] is created per page session and passed to whoever
//! needs it. Host scripts look widgets up by name; widgets push state back
//! through the [`ChangeListener`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use serde_json::Map;
use serde_json::Value;

use crate::search::SearchController;
use crate::table::TableHandle;

/// Receives state pushed by widgets, e.g. `{"selecteditem": ...}`.
pub trait ChangeListener: Send + Sync {
    /// The named widget changed the given properties.
    fn on_change(&self, name: &str, patch: &Map<String, Value>);
}

/// A registered widget.
#[derive(Debug, Clone)]
pub enum WidgetHandle {
    /// A data table.
    Table(TableHandle),
    /// A search widget.
    Search(Arc<SearchController>),
}

impl WidgetHandle {
    fn dispose(&self) {
        match self {
            Self::Table(table) => table.dispose(),
            Self::Search(search) => search.dispose(),
        }
    }
}

/// Directory of the widgets of one page session.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tablekit_lib::config::{SearchConfig, TableConfig};
/// use tablekit_lib::registry::{WidgetHandle, WidgetRegistry};
/// use tablekit_lib::search::{LocalSearchProvider, SearchController};
/// use tablekit_lib::table::DataTable;
///
/// let registry = WidgetRegistry::new();
/// let table = DataTable::new(TableConfig::new("orders"), Vec::new()).into_handle();
/// registry.register("orders", WidgetHandle::Table(table));
///
/// let search = SearchController::new(Arc::new(LocalSearchProvider::default()), SearchConfig::default());
/// registry.register("find", WidgetHandle::Search(Arc::new(search)));
///
/// assert!(registry.lookup_table("orders").is_some());
/// assert!(registry.lookup_table("find").is_none());
///
/// registry.teardown();
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    widgets: DashMap<String, WidgetHandle>,
    torn_down: AtomicBool,
}

impl WidgetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a widget, returning the one it replaced.
    ///
    /// After [`teardown`](Self::teardown) nothing can be registered.
    pub fn register(&self, name: impl Into<String>, handle: WidgetHandle) -> Option<WidgetHandle> {
        let name = name.into();
        if self.torn_down.load(Ordering::SeqCst) {
            log::warn!("Ignoring registration of {}: registry torn down", name);
            return None;
        }
        log::debug!("Registering widget {}", name);
        self.widgets.insert(name, handle)
    }

    /// Looks a widget up by name.
    pub fn lookup(&self, name: &str) -> Option<WidgetHandle> {
        self.widgets.get(name).map(|entry| entry.value().clone())
    }

    /// Looks a table up by name.
    pub fn lookup_table(&self, name: &str) -> Option<TableHandle> {
        match self.lookup(name)? {
            WidgetHandle::Table(table) => Some(table),
            WidgetHandle::Search(_) => None,
        }
    }

    /// Looks a search widget up by name.
    pub fn lookup_search(&self, name: &str) -> Option<Arc<SearchController>> {
        match self.lookup(name)? {
            WidgetHandle::Search(search) => Some(search),
            WidgetHandle::Table(_) => None,
        }
    }

    /// Removes and disposes a widget.
    pub fn unregister(&self, name: &str) -> Option<WidgetHandle> {
        let (_, handle) = self.widgets.remove(name)?;
        handle.dispose();
        Some(handle)
    }

    /// Returns the registered names.
    pub fn names(&self) -> Vec<String> {
        self.widgets.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered widgets.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Disposes every widget and closes the registry.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        let names = self.names();
        log::debug!("Tearing down {} widgets", names.len());
        for name in names {
            self.unregister(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::table::DataTable;

    #[test]
    fn test_register_replaces_and_teardown_closes() {
        let registry = WidgetRegistry::new();
        let first = DataTable::new(TableConfig::new("grid"), Vec::new()).into_handle();
        let second = DataTable::new(TableConfig::new("grid"), Vec::new()).into_handle();

        assert!(registry.register("grid", WidgetHandle::Table(first)).is_none());
        assert!(registry.register("grid", WidgetHandle::Table(second.clone())).is_some());
        assert!(Arc::ptr_eq(&registry.lookup_table("grid").unwrap(), &second));

        registry.teardown();
        assert!(second.is_disposed());
        let third = DataTable::new(TableConfig::new("grid"), Vec::new()).into_handle();
        assert!(registry.register("grid", WidgetHandle::Table(third)).is_none());
        assert!(registry.is_empty());
    }
}
