//! Copy-on-write dataset shared between table engines

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use super::Row;
use super::RowId;
use crate::util::read_lock;
use crate::util::write_lock;

/// The committed rows a table currently holds.
///
/// Every mutation builds a new `Vec` and swaps it in, so a snapshot taken
/// before the mutation never observes a half-updated array. Each swap bumps
/// a version that downstream caches compare against.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Arc<RwLock<Arc<Vec<Row>>>>,
    version: Arc<AtomicU64>,
}

impl Dataset {
    /// Creates a dataset holding `rows`.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Arc::new(rows))),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the current rows. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<Vec<Row>> {
        Arc::clone(&read_lock(&self.rows))
    }

    /// Replaces all rows.
    pub fn replace(&self, rows: Vec<Row>) {
        *write_lock(&self.rows) = Arc::new(rows);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Restores a previously taken snapshot (used for rollback).
    pub fn restore(&self, snapshot: Arc<Vec<Row>>) {
        *write_lock(&self.rows) = snapshot;
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Applies `f` to a fresh copy of the rows and swaps the copy in.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Row>) -> R) -> R {
        let mut guard = write_lock(&self.rows);
        let mut next = Vec::clone(&guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        drop(guard);
        self.version.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        read_lock(&self.rows).len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the mutation counter.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Finds a row by id.
    pub fn find(&self, id: &RowId) -> Option<Row> {
        read_lock(&self.rows).iter().find(|row| row.id() == id).cloned()
    }

    /// Returns the position of a row by id.
    pub fn position(&self, id: &RowId) -> Option<usize> {
        read_lock(&self.rows).iter().position(|row| row.id() == id)
    }

    /// Returns `true` if a row with `id` exists.
    pub fn contains(&self, id: &RowId) -> bool {
        self.position(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::add_unique_row_ids;

    #[test]
    fn test_snapshot_unaffected_by_update() {
        let dataset = Dataset::new(add_unique_row_ids(vec![json!({"id": 1}), json!({"id": 2})]));
        let before = dataset.snapshot();
        let version = dataset.version();

        dataset.update(|rows| rows.remove(0));

        assert_eq!(before.len(), 2);
        assert_eq!(dataset.len(), 1);
        assert!(dataset.version() > version);
        assert!(!dataset.contains(&RowId::new("1")));
    }
}
