//! Client-side search

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use super::DATA_OBJECT_FIELD;
use super::SearchProvider;
use super::apply_limit;
use crate::config::SearchConfig;
use crate::error::DatasourceError;
use crate::model::display_string;
use crate::util::read_lock;
use crate::util::write_lock;

/// Searches an in-memory list of entries.
///
/// Entries may be plain strings, plain objects, or `{dataObject: {...}}`
/// wrappers. Objects match when any searched key matches, or, without
/// search keys, when all their values joined with spaces match.
///
/// # Example
///
/// ```
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// use serde_json::json;
/// use tablekit_lib::config::SearchConfig;
/// use tablekit_lib::query::MatchMode;
/// use tablekit_lib::search::{LocalSearchProvider, SearchProvider};
///
/// let provider = LocalSearchProvider::new(vec![json!({"name": "Ada"}), json!({"name": "Grace"})]);
/// let config = SearchConfig::default().with_keys(["name"]).with_match_mode(MatchMode::Exact);
/// let results = provider.search("grace", &config).await.unwrap();
/// assert_eq!(results, vec![json!({"name": "Grace"})]);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct LocalSearchProvider {
    entries: RwLock<Vec<Value>>,
}

impl LocalSearchProvider {
    /// Creates a provider over `entries`.
    pub fn new(entries: Vec<Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Replaces the entries.
    pub fn set_entries(&self, entries: Vec<Value>) {
        *write_lock(&self.entries) = entries;
    }

    /// Returns `true` if `entry` matches `query`.
    pub fn matches(entry: &Value, query: &str, config: &SearchConfig) -> bool {
        let test = |text: &str| config.matchmode.matches(text, query, config.casesensitive);
        match entry {
            Value::Object(fields) => {
                let fields = unwrap_data_object(fields);
                if config.searchkey.is_empty() {
                    let joined = fields
                        .values()
                        .map(display_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    test(&joined)
                } else {
                    config
                        .searchkey
                        .iter()
                        .filter_map(|key| fields.get(key))
                        .any(|value| test(&display_string(value)))
                }
            }
            Value::Null => false,
            scalar => test(&display_string(scalar)),
        }
    }
}

#[async_trait]
impl SearchProvider for LocalSearchProvider {
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<Vec<Value>, DatasourceError> {
        let results = read_lock(&self.entries)
            .iter()
            .filter(|entry| Self::matches(entry, query, config))
            .cloned()
            .collect();
        Ok(apply_limit(results, config.limit))
    }
}

fn unwrap_data_object(fields: &Map<String, Value>) -> &Map<String, Value> {
    match fields.get(DATA_OBJECT_FIELD) {
        Some(Value::Object(inner)) => inner,
        _ => fields,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::MatchMode;

    #[tokio::test]
    async fn test_start_mode_on_strings() {
        let provider = LocalSearchProvider::new(vec![json!("Apple"), json!("Banana"), json!("Grape")]);
        let config = SearchConfig::default()
            .with_match_mode(MatchMode::Start)
            .with_case_sensitive(true);
        assert_eq!(provider.search("Gr", &config).await.unwrap(), vec![json!("Grape")]);
        assert!(provider.search("a", &config).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_object_and_keys() {
        let provider = LocalSearchProvider::new(vec![
            json!({"dataObject": {"name": "Ada", "city": "London"}}),
            json!({"name": "Linus", "city": "Helsinki"}),
        ]);
        let config = SearchConfig::default();
        // without keys the joined values are searched
        assert_eq!(provider.search("lon", &config).await.unwrap().len(), 1);
        assert_eq!(provider.search("n", &config).await.unwrap().len(), 2);

        let config = config.with_keys(["city"]);
        assert!(provider.search("linus", &config).await.unwrap().is_empty());
        assert_eq!(provider.search("hel", &config).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_limit() {
        let provider = LocalSearchProvider::new((0..10).map(|i| json!(format!("item {}", i))).collect());
        let config = SearchConfig::default().with_limit(3);
        assert_eq!(provider.search("item", &config).await.unwrap().len(), 3);
    }
}
