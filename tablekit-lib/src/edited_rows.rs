//! Per-row working copies of in-progress edits.
//!
//! Editing one cell notifies only the listeners of that row plus the global
//! listeners, so a 1000-row table re-renders one row per keystroke.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Map;
use serde_json::Value;

use crate::model::RowId;
use crate::util::read_lock;
use crate::util::write_lock;

/// Callback receiving a row id and that row's current edits.
pub type EditListener = Arc<dyn Fn(&RowId, &Map<String, Value>) + Send + Sync>;

#[derive(Default)]
struct Inner {
    edits: RwLock<HashMap<RowId, Map<String, Value>>>,
    row_listeners: RwLock<HashMap<RowId, Vec<(u64, EditListener)>>>,
    global_listeners: RwLock<Vec<(u64, EditListener)>>,
    next_id: AtomicU64,
}

/// Registry of in-progress edits, keyed by row id then field.
///
/// Cheap to clone; clones share the same registry.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::edited_rows::EditedRows;
/// use tablekit_lib::model::RowId;
///
/// let edits = EditedRows::new();
/// let row = RowId::new("r1");
/// edits.update_cell(&row, "name", json!("Ada"));
/// assert_eq!(edits.get_edits(&row).unwrap()["name"], json!("Ada"));
/// ```
#[derive(Clone, Default)]
pub struct EditedRows {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EditedRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditedRows")
            .field("edits", &*read_lock(&self.inner.edits))
            .finish_non_exhaustive()
    }
}

impl EditedRows {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edit. Listeners are skipped when the value is unchanged.
    ///
    /// Returns `true` if the value changed.
    pub fn update_cell(&self, row_id: &RowId, field: &str, value: Value) -> bool {
        let snapshot = {
            let mut edits = write_lock(&self.inner.edits);
            let row = edits.entry(row_id.clone()).or_default();
            if row.get(field) == Some(&value) {
                return false;
            }
            row.insert(field.to_string(), value);
            row.clone()
        };
        self.notify(row_id, &snapshot);
        true
    }

    /// Returns the edits of one row.
    pub fn get_edits(&self, row_id: &RowId) -> Option<Map<String, Value>> {
        read_lock(&self.inner.edits).get(row_id).cloned()
    }

    /// Returns every row's edits.
    pub fn get_all_edits(&self) -> HashMap<RowId, Map<String, Value>> {
        read_lock(&self.inner.edits).clone()
    }

    /// Returns `true` if the row has pending edits.
    pub fn has_edits(&self, row_id: &RowId) -> bool {
        read_lock(&self.inner.edits)
            .get(row_id)
            .is_some_and(|row| !row.is_empty())
    }

    /// Drops a row's edits and notifies its listeners with an empty map.
    pub fn remove_row_edits(&self, row_id: &RowId) {
        let removed = write_lock(&self.inner.edits).remove(row_id).is_some();
        if removed {
            self.notify(row_id, &Map::new());
        }
    }

    /// Drops every row's edits.
    pub fn clear(&self) {
        let rows: Vec<RowId> = write_lock(&self.inner.edits).drain().map(|(id, _)| id).collect();
        for row_id in rows {
            self.notify(&row_id, &Map::new());
        }
    }

    /// Listens to edits of one row.
    pub fn subscribe(
        &self,
        row_id: &RowId,
        listener: impl Fn(&RowId, &Map<String, Value>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        write_lock(&self.inner.row_listeners)
            .entry(row_id.clone())
            .or_default()
            .push((id, Arc::new(listener)));
        Subscription {
            registry: Arc::downgrade(&self.inner),
            row_id: Some(row_id.clone()),
            id,
        }
    }

    /// Listens to edits of every row.
    pub fn subscribe_to_all(
        &self,
        listener: impl Fn(&RowId, &Map<String, Value>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        write_lock(&self.inner.global_listeners).push((id, Arc::new(listener)));
        Subscription {
            registry: Arc::downgrade(&self.inner),
            row_id: None,
            id,
        }
    }

    fn notify(&self, row_id: &RowId, edits: &Map<String, Value>) {
        // Listeners run outside the locks so they may read the registry.
        let mut listeners: Vec<EditListener> = read_lock(&self.inner.row_listeners)
            .get(row_id)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        listeners.extend(
            read_lock(&self.inner.global_listeners)
                .iter()
                .map(|(_, l)| Arc::clone(l)),
        );
        for listener in listeners {
            listener(row_id, edits);
        }
    }
}

/// Handle returned by [`EditedRows::subscribe`] and
/// [`EditedRows::subscribe_to_all`].
///
/// Dropping the handle keeps the listener; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Inner>,
    row_id: Option<RowId>,
    id: u64,
}

impl Subscription {
    /// Removes the listener.
    pub fn unsubscribe(self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        match &self.row_id {
            Some(row_id) => {
                let mut listeners = write_lock(&inner.row_listeners);
                if let Some(list) = listeners.get_mut(row_id) {
                    list.retain(|(id, _)| *id != self.id);
                    if list.is_empty() {
                        listeners.remove(row_id);
                    }
                }
            }
            None => write_lock(&inner.global_listeners).retain(|(id, _)| *id != self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&RowId, &Map<String, Value>) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &RowId, _: &Map<String, Value>| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_only_subscribed_row_is_notified() {
        let edits = EditedRows::new();
        let (r1_count, r1_listener) = counter();
        let (r2_count, r2_listener) = counter();
        let (all_count, all_listener) = counter();
        edits.subscribe(&RowId::new("r1"), r1_listener);
        edits.subscribe(&RowId::new("r2"), r2_listener);
        edits.subscribe_to_all(all_listener);

        edits.update_cell(&RowId::new("r1"), "name", json!("a"));

        assert_eq!(r1_count.load(Ordering::SeqCst), 1);
        assert_eq!(r2_count.load(Ordering::SeqCst), 0);
        assert_eq!(all_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unchanged_value_skips_notification() {
        let edits = EditedRows::new();
        let (count, listener) = counter();
        edits.subscribe_to_all(listener);
        assert!(edits.update_cell(&RowId::new("r1"), "name", json!("a")));
        assert!(!edits.update_cell(&RowId::new("r1"), "name", json!("a")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_row_edits_notifies_and_clears() {
        let edits = EditedRows::new();
        let row = RowId::new("r1");
        let seen = Arc::new(RwLock::new(None));
        let s = Arc::clone(&seen);
        edits.subscribe(&row, move |_, map| *s.write().unwrap() = Some(map.len()));

        edits.update_cell(&row, "name", json!("a"));
        assert_eq!(*seen.read().unwrap(), Some(1));
        edits.remove_row_edits(&row);
        assert_eq!(*seen.read().unwrap(), Some(0));
        assert!(edits.get_edits(&row).is_none());
        assert!(edits.get_all_edits().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let edits = EditedRows::new();
        let (count, listener) = counter();
        let subscription = edits.subscribe(&RowId::new("r1"), listener);
        subscription.unsubscribe();
        edits.update_cell(&RowId::new("r1"), "name", json!("a"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_read_registry() {
        let edits = EditedRows::new();
        let reader = edits.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        edits.subscribe_to_all(move |row, _| {
            s.store(reader.get_edits(row).map(|m| m.len()).unwrap_or(0), Ordering::SeqCst);
        });
        edits.update_cell(&RowId::new("r1"), "a", json!(1));
        edits.update_cell(&RowId::new("r1"), "b", json!(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
