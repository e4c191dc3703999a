//! SQLite-backed state storage.

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

use super::StateStorage;
use super::StorageScope;
use super::TableState;
use crate::error::StorageError;

/// State storage backed by SQLite.
///
/// Blobs are stored as JSON text, one row per table name and scope, and
/// survive process restarts. Uses WAL journal mode.
///
/// # Example
///
/// ```ignore
/// use tablekit_lib::persistence::SqliteStateStorage;
///
/// let storage = SqliteStateStorage::open("state.db").await?;
/// ```
pub struct SqliteStateStorage {
    client: Client,
}

impl std::fmt::Debug for SqliteStateStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStateStorage").finish_non_exhaustive()
    }
}

impl SqliteStateStorage {
    /// Opens the storage at `path`, creating the database if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Opens an in-memory database. State is lost when dropped.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    async fn init_schema(client: &Client) -> Result<(), async_sqlite::Error> {
        client
            .conn(|conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS table_state (
                        name TEXT NOT NULL,
                        scope TEXT NOT NULL,
                        state TEXT NOT NULL,
                        updated_at INTEGER NOT NULL,
                        PRIMARY KEY (name, scope)
                    )",
                    [],
                )?;
                Ok(())
            })
            .await
    }

    /// Returns when the blob was last written.
    pub async fn updated_at(&self, name: &str, scope: StorageScope) -> Result<Option<DateTime<Utc>>, StorageError> {
        let name = name.to_string();
        let scope = scope.as_str();
        let timestamp = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    "SELECT updated_at FROM table_state WHERE name = ? AND scope = ?",
                    rusqlite::params![name, scope],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
            })
            .await?;
        Ok(timestamp.and_then(|ts| Utc.timestamp_opt(ts, 0).single()))
    }

    /// Returns the number of stored blobs.
    pub async fn len(&self) -> Result<usize, StorageError> {
        let count = self
            .client
            .conn(|conn| conn.query_row("SELECT COUNT(*) FROM table_state", [], |row| row.get::<_, i64>(0)))
            .await?;
        // COUNT(*) is never negative
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().await.map(|len| len == 0)
    }
}

#[async_trait]
impl StateStorage for SqliteStateStorage {
    async fn get_table_state(&self, name: &str, scope: StorageScope) -> Result<Option<TableState>, StorageError> {
        let name = name.to_string();
        let scope = scope.as_str();
        let json = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    "SELECT state FROM table_state WHERE name = ? AND scope = ?",
                    rusqlite::params![name, scope],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_table_state(&self, name: &str, scope: StorageScope, state: &TableState) -> Result<(), StorageError> {
        let name = name.to_string();
        let scope = scope.as_str();
        let json = serde_json::to_string(state)?;
        let now = Utc::now().timestamp();

        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO table_state (name, scope, state, updated_at) VALUES (?, ?, ?, ?)",
                    rusqlite::params![name, scope, json, now],
                )
            })
            .await?;
        Ok(())
    }

    async fn clear_table_state(&self, name: &str, scope: StorageScope) -> Result<(), StorageError> {
        let name = name.to_string();
        let scope = scope.as_str();

        self.client
            .conn(move |conn| {
                conn.execute(
                    "DELETE FROM table_state WHERE name = ? AND scope = ?",
                    rusqlite::params![name, scope],
                )
            })
            .await?;
        Ok(())
    }
}
