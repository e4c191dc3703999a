//! Datasource-backed search

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::SearchProvider;
use super::apply_limit;
use crate::config::SearchConfig;
use crate::datasource::Datasource;
use crate::datasource::InvokeOptions;
use crate::error::DatasourceError;
use crate::query::FilterSpec;
use crate::query::LogicalOp;

/// Lets the datasource do the filtering: one filter per search key, any of
/// which may match.
pub struct RemoteSearchProvider {
    datasource: Arc<dyn Datasource>,
}

impl std::fmt::Debug for RemoteSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSearchProvider").finish_non_exhaustive()
    }
}

impl RemoteSearchProvider {
    /// Creates a provider over `datasource`.
    pub fn new(datasource: Arc<dyn Datasource>) -> Self {
        Self { datasource }
    }

    fn options(query: &str, config: &SearchConfig) -> InvokeOptions {
        let filters = config
            .searchkey
            .iter()
            .map(|key| FilterSpec::new(key.as_str(), query).match_mode(config.matchmode))
            .collect();
        let options = InvokeOptions::page(1)
            .with_filters(filters)
            .with_condition(LogicalOp::Or);
        if config.limit > 0 {
            options.with_size(config.limit)
        } else {
            options
        }
    }
}

#[async_trait]
impl SearchProvider for RemoteSearchProvider {
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<Vec<Value>, DatasourceError> {
        if config.searchkey.is_empty() {
            log::warn!("Remote search without search keys, sending no filters");
        }
        match self.datasource.invoke(Self::options(query, config)).await {
            Ok(response) => Ok(apply_limit(response.data, config.limit)),
            Err(err) if err.is_parse() => {
                log::error!("Ignoring malformed search response: {}", err);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::datasource::MemoryDatasource;
    use crate::query::MatchMode;

    #[tokio::test]
    async fn test_one_filter_per_key() {
        let ds = Arc::new(MemoryDatasource::new(vec![
            json!({"name": "Ada", "city": "London"}),
            json!({"name": "Linus", "city": "Helsinki"}),
        ]));
        let provider = RemoteSearchProvider::new(ds.clone());
        let config = SearchConfig::default()
            .with_keys(["name", "city"])
            .with_match_mode(MatchMode::Start);

        let results = provider.search("l", &config).await.unwrap();
        assert_eq!(results.len(), 2);

        let call = &ds.invocations()[0];
        assert_eq!(call.filter_fields.len(), 2);
        assert_eq!(call.filter_fields[1].match_mode, MatchMode::Start);
        assert_eq!(call.condition, LogicalOp::Or);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let ds = Arc::new(MemoryDatasource::new(Vec::new()));
        let provider = RemoteSearchProvider::new(ds);
        let config = SearchConfig::default().with_keys(["name"]);
        assert!(provider.search("x", &config).await.unwrap().is_empty());
    }
}
