//! Table state persistence
//!
//! Pagination, page size, selection, filter and sort are reconciled into a
//! single [`TableState`] blob per table name and [`StorageScope`]. The
//! [`TableStateManager`] decides what goes into the blob; a
//! [`StateStorage`] implementation stores it.

mod manager;
mod memory;
mod sqlite;
mod state;

pub use manager::*;
pub use memory::*;
pub use sqlite::*;
pub use state::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::error::StorageError;

/// Storage tier for persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Lives for the browser session.
    #[serde(alias = "sessionStorage")]
    Session,
    /// Lives until cleared.
    #[serde(alias = "localStorage")]
    Local,
}

impl StorageScope {
    /// Returns the scope name as stored.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Local => "local",
        }
    }
}

/// Trait for persisted-state stores.
///
/// Blobs are keyed by table name and scope; the same name in two scopes
/// are two unrelated blobs.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Reads the blob, `None` when nothing is stored.
    async fn get_table_state(&self, name: &str, scope: StorageScope) -> Result<Option<TableState>, StorageError>;

    /// Writes the blob, replacing any previous one.
    async fn save_table_state(&self, name: &str, scope: StorageScope, state: &TableState) -> Result<(), StorageError>;

    /// Removes the blob.
    async fn clear_table_state(&self, name: &str, scope: StorageScope) -> Result<(), StorageError>;
}
