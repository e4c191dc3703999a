//! Per-table nested key-value store.
//!
//! A render-optimization cache for per-row/per-field values and the current
//! selection. It is not a source of truth for anything that must survive
//! the table going away.

use std::sync::Arc;
use std::sync::RwLock;

use dashmap::DashMap;
use serde_json::Map;
use serde_json::Value;

use crate::util::read_lock;
use crate::util::write_lock;

/// A nested JSON store scoped to one table instance.
///
/// Paths are slices of keys, e.g. `&["edits", "row-1", "name"]`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::cell_state::CellState;
///
/// let state = CellState::new("grid");
/// assert!(state.set_value(&["edits", "r1", "name"], json!("Ada")));
/// assert!(!state.set_value(&["edits", "r1", "name"], json!("Ada")));
/// assert_eq!(state.get_value(&["edits", "r1", "name"], json!(null)), json!("Ada"));
/// ```
#[derive(Debug, Clone)]
pub struct CellState {
    scope: Arc<str>,
    root: Arc<RwLock<Map<String, Value>>>,
}

impl CellState {
    /// Creates an empty store for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: Arc::from(scope.into()),
            root: Arc::default(),
        }
    }

    /// Returns the scope id.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the value at `path`, or `default` when absent.
    pub fn get_value(&self, path: &[&str], default: Value) -> Value {
        let root = read_lock(&self.root);
        lookup(&root, path).cloned().unwrap_or(default)
    }

    /// Returns `true` if a value exists at `path`.
    pub fn has_value(&self, path: &[&str]) -> bool {
        lookup(&read_lock(&self.root), path).is_some()
    }

    /// Stores `value` at `path`, creating intermediate objects.
    ///
    /// Returns `false` without touching the store when the existing value is
    /// deep-equal.
    pub fn set_value(&self, path: &[&str], value: Value) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut root = write_lock(&self.root);
        if lookup(&root, path) == Some(&value) {
            return false;
        }
        let mut current = &mut *root;
        for key in parents {
            let slot = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return false;
            };
            current = map;
        }
        current.insert(last.to_string(), value);
        true
    }

    /// Removes the value at `path`. Returns `true` if something was removed.
    pub fn remove_value(&self, path: &[&str]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut root = write_lock(&self.root);
        let mut current = &mut *root;
        for key in parents {
            match current.get_mut(*key) {
                Some(Value::Object(map)) => current = map,
                _ => return false,
            }
        }
        current.remove(*last).is_some()
    }

    /// Deep-merges `patch` into the store.
    pub fn update_state(&self, patch: Map<String, Value>) {
        let mut root = write_lock(&self.root);
        deep_merge(&mut root, patch);
    }

    /// Updates the whole state with a closure.
    pub fn update_with(&self, f: impl FnOnce(&mut Map<String, Value>)) {
        f(&mut write_lock(&self.root));
    }

    /// Returns a deep copy of the whole state.
    pub fn get_state(&self) -> Map<String, Value> {
        read_lock(&self.root).clone()
    }

    /// Replaces the whole state with a copy of `state`.
    pub fn set_state(&self, state: &Map<String, Value>) {
        *write_lock(&self.root) = state.clone();
    }

    /// Empties the store.
    pub fn clear_state(&self) {
        write_lock(&self.root).clear();
    }
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = root.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Hands out one [`CellState`] per table name.
#[derive(Debug, Default, Clone)]
pub struct CellStateRegistry {
    scopes: Arc<DashMap<String, CellState>>,
}

impl CellStateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `scope`, creating it on first use.
    pub fn scope(&self, scope: &str) -> CellState {
        self.scopes
            .entry(scope.to_string())
            .or_insert_with(|| CellState::new(scope))
            .clone()
    }

    /// Drops the store for `scope`.
    pub fn release(&self, scope: &str) {
        self.scopes.remove(scope);
    }

    /// Returns the number of live scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns `true` if no scope is live.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
