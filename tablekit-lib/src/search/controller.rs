//! Debounced, latest-wins search

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::SearchProvider;
use crate::config::SearchConfig;
use crate::util::read_lock;
use crate::util::write_lock;

/// Result of [`SearchController::search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query is shorter than `minchars`; results were cleared.
    TooShort,
    /// A newer query was issued; nothing was applied.
    Superseded,
    /// These results are now current.
    Results(Vec<Value>),
    /// The provider failed; results were cleared.
    Failed(String),
    /// The controller was disposed.
    Cancelled,
}

/// Runs queries against a [`SearchProvider`].
///
/// Each query takes a generation token; its results are applied only if no
/// newer query was issued while it was debouncing or in flight.
pub struct SearchController {
    provider: Arc<dyn SearchProvider>,
    config: SearchConfig,
    generation: AtomicU64,
    results: RwLock<Vec<Value>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SearchController {
    /// Creates a controller.
    pub fn new(provider: Arc<dyn SearchProvider>, config: SearchConfig) -> Self {
        Self {
            provider,
            config,
            generation: AtomicU64::new(0),
            results: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Returns the current results.
    pub fn results(&self) -> Vec<Value> {
        read_lock(&self.results).clone()
    }

    /// Searches for `query` after the debounce delay.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        if self.cancel.is_cancelled() {
            return SearchOutcome::Cancelled;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if query.chars().count() < self.config.minchars {
            write_lock(&self.results).clear();
            return SearchOutcome::TooShort;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.config.debounce) => {}
            _ = self.cancel.cancelled() => return SearchOutcome::Cancelled,
        }
        if self.is_stale(generation) {
            return SearchOutcome::Superseded;
        }

        let result = self.provider.search(query, &self.config).await;
        if self.is_stale(generation) {
            log::debug!("Dropping results of superseded search {:?}", query);
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(results) => {
                log::debug!("Search {:?} found {} results", query, results.len());
                *write_lock(&self.results) = results.clone();
                SearchOutcome::Results(results)
            }
            Err(err) => {
                log::error!("Search {:?} failed: {}", query, err);
                write_lock(&self.results).clear();
                SearchOutcome::Failed(err.to_string())
            }
        }
    }

    /// Cancels pending searches; later searches are ignored.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::search::LocalSearchProvider;

    fn controller(config: SearchConfig) -> SearchController {
        let provider = LocalSearchProvider::new(vec![json!("Apple"), json!("Banana"), json!("Grape")]);
        SearchController::new(Arc::new(provider), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_query_wins() {
        let controller = controller(SearchConfig::default());
        let (first, second) = tokio::join!(controller.search("ap"), controller.search("an"));
        assert_eq!(first, SearchOutcome::Superseded);
        assert_eq!(second, SearchOutcome::Results(vec![json!("Banana")]));
        assert_eq!(controller.results(), vec![json!("Banana")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_chars_clears_results() {
        let controller = controller(SearchConfig::default().with_min_chars(2));
        assert!(matches!(controller.search("gr").await, SearchOutcome::Results(_)));
        assert_eq!(controller.search("g").await, SearchOutcome::TooShort);
        assert!(controller.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_elapses_before_search() {
        let controller = controller(SearchConfig::default().with_debounce(Duration::from_millis(300)));
        let start = tokio::time::Instant::now();
        controller.search("a").await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
