//! In-memory state storage using DashMap

use async_trait::async_trait;
use dashmap::DashMap;

use super::StateStorage;
use super::StorageScope;
use super::TableState;
use crate::error::StorageError;

/// State storage backed by a concurrent hash map.
///
/// Fast and thread-safe, but state is lost when the process exits.
///
/// # Example
///
/// ```
/// use tablekit_lib::persistence::MemoryStateStorage;
///
/// let storage = MemoryStateStorage::new();
/// assert!(storage.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStateStorage {
    store: DashMap<(StorageScope, String), TableState>,
}

impl MemoryStateStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Returns the number of stored blobs.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl StateStorage for MemoryStateStorage {
    async fn get_table_state(&self, name: &str, scope: StorageScope) -> Result<Option<TableState>, StorageError> {
        Ok(self
            .store
            .get(&(scope, name.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn save_table_state(&self, name: &str, scope: StorageScope, state: &TableState) -> Result<(), StorageError> {
        self.store.insert((scope, name.to_string()), state.clone());
        Ok(())
    }

    async fn clear_table_state(&self, name: &str, scope: StorageScope) -> Result<(), StorageError> {
        self.store.remove(&(scope, name.to_string()));
        Ok(())
    }
}
