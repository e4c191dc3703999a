//! Data providers of the search widget
//!
//! A [`SearchProvider`] answers a query either from an in-memory list
//! ([`LocalSearchProvider`]) or by asking a datasource to filter
//! ([`RemoteSearchProvider`]). [`SearchController`] sits in front of either
//! one and makes sure only the latest query's results are applied.

mod controller;
mod local;
mod remote;

pub use controller::*;
pub use local::*;
pub use remote::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::error::DatasourceError;

/// Key of the wrapped record in `{dataObject: ...}` entries.
pub const DATA_OBJECT_FIELD: &str = "dataObject";

/// Answers search queries.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the entries matching `query`, at most `config.limit` of them
    /// when a limit is set.
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<Vec<Value>, DatasourceError>;
}

/// Truncates to `limit`; 0 means unlimited.
fn apply_limit(mut results: Vec<Value>, limit: usize) -> Vec<Value> {
    if limit > 0 {
        results.truncate(limit);
    }
    results
}
