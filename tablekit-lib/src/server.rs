//! Server-side sort and filter
//!
//! [`ServerQueryAdapter`] turns sort/filter changes of a server-paginated
//! table into datasource requests. Bursts are debounced so only the
//! trailing query is sent, and a response is dropped when a newer query was
//! submitted while it was in flight.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::config::DEFAULT_QUERY_DEBOUNCE;
use crate::config::Messages;
use crate::datasource::Datasource;
use crate::datasource::InvokeOptions;
use crate::datasource::PageMeta;
use crate::error::Error;
use crate::events::NoopEvents;
use crate::events::TableEvents;
use crate::events::TableOperation;
use crate::events::Toast;
use crate::model::Row;
use crate::model::add_unique_row_ids;
use crate::pagination::PageQuery;
use crate::query::FilterSpec;
use crate::query::LogicalOp;
use crate::query::SortColumn;
use crate::query::order_by;
use crate::util::lock;

/// Sorting and filters of a server-side table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerQuery {
    /// Sorting, most significant first.
    pub sorting: Vec<SortColumn>,
    /// Column filters.
    pub filters: Vec<FilterSpec>,
    /// How filters combine.
    pub condition: LogicalOp,
}

impl ServerQuery {
    /// Creates a query.
    pub fn new(sorting: Vec<SortColumn>, filters: Vec<FilterSpec>) -> Self {
        Self {
            sorting,
            filters,
            condition: LogicalOp::And,
        }
    }

    /// Returns the order clause, `None` when unsorted.
    pub fn order_by(&self) -> Option<String> {
        let clause = order_by(&self.sorting);
        (!clause.is_empty()).then_some(clause)
    }

    /// Returns the options a paginator forwards with later page fetches.
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            order_by: self.order_by(),
            filter_fields: self.active_filters(),
            condition: self.condition,
        }
    }

    fn active_filters(&self) -> Vec<FilterSpec> {
        self.filters.iter().filter(|f| !f.is_blank()).cloned().collect()
    }

    /// Serialized form, used to detect unchanged queries.
    fn key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of [`ServerQueryAdapter::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// First query after mount; the mount fetch already covers it.
    Skipped,
    /// Same as the last applied query.
    Unchanged,
    /// A newer query replaced this one.
    Superseded,
    /// The datasource is loading; the query runs on
    /// [`ServerQueryAdapter::on_loading_complete`].
    Pending,
    /// Page 1 of the new query.
    Applied {
        /// Rows, tagged with stable ids.
        rows: Vec<Row>,
        /// Paging metadata.
        meta: Option<PageMeta>,
    },
    /// The request failed and was reported.
    Failed,
    /// The adapter was disposed.
    Cancelled,
}

#[derive(Debug, Default)]
struct AdapterState {
    mounted: bool,
    last_applied: Option<String>,
    pending: Option<ServerQuery>,
}

/// Sends debounced sort/filter queries to a datasource.
pub struct ServerQueryAdapter {
    datasource: Arc<dyn Datasource>,
    debounce: Duration,
    page_size: AtomicUsize,
    state: Mutex<AdapterState>,
    generation: AtomicU64,
    cancel: CancellationToken,
    events: Arc<dyn TableEvents>,
    messages: Messages,
}

impl std::fmt::Debug for ServerQueryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerQueryAdapter")
            .field("debounce", &self.debounce)
            .field("state", &*lock(&self.state))
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ServerQueryAdapter {
    /// Creates an adapter over `datasource` with the default debounce.
    pub fn new(datasource: Arc<dyn Datasource>) -> Self {
        Self {
            datasource,
            debounce: DEFAULT_QUERY_DEBOUNCE,
            page_size: AtomicUsize::new(DEFAULT_PAGE_SIZE),
            state: Mutex::new(AdapterState::default()),
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            events: Arc::new(NoopEvents),
            messages: Messages::default(),
        }
    }

    /// Sets the debounce delay.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the host callbacks.
    pub fn with_events(mut self, events: Arc<dyn TableEvents>) -> Self {
        self.events = events;
        self
    }

    /// Sets the toast messages.
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the page size requested with page 1.
    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size.max(1), Ordering::SeqCst);
    }

    /// Records `query` as applied without sending it (e.g. after a
    /// restored mount fetch).
    pub fn mark_applied(&self, query: &ServerQuery) {
        let mut state = lock(&self.state);
        state.mounted = true;
        state.last_applied = Some(query.key());
    }

    /// Submits a sort/filter change.
    pub async fn submit(&self, query: ServerQuery) -> QueryOutcome {
        if self.cancel.is_cancelled() {
            return QueryOutcome::Cancelled;
        }
        let key = query.key();
        {
            let mut state = lock(&self.state);
            if !state.mounted {
                state.mounted = true;
                state.last_applied = Some(key);
                return QueryOutcome::Skipped;
            }
            if state.last_applied.as_deref() == Some(key.as_str()) {
                return QueryOutcome::Unchanged;
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::select! {
            _ = tokio::time::sleep(self.debounce) => {}
            _ = self.cancel.cancelled() => return QueryOutcome::Cancelled,
        }
        if self.is_stale(generation) {
            return QueryOutcome::Superseded;
        }
        self.run(query, key, generation).await
    }

    /// Re-applies a query deferred while the datasource was loading.
    pub async fn on_loading_complete(&self) -> Option<QueryOutcome> {
        let query = lock(&self.state).pending.take()?;
        if self.cancel.is_cancelled() {
            return Some(QueryOutcome::Cancelled);
        }
        log::debug!("Datasource finished loading, applying deferred query");
        let key = query.key();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Some(self.run(query, key, generation).await)
    }

    /// Cancels pending debounces; later submits are ignored.
    pub fn dispose(&self) {
        self.cancel.cancel();
        lock(&self.state).pending = None;
    }

    /// Returns `true` once disposed.
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    async fn run(&self, query: ServerQuery, key: String, generation: u64) -> QueryOutcome {
        if self.datasource.is_loading() {
            log::debug!("Datasource loading, deferring query");
            lock(&self.state).pending = Some(query);
            return QueryOutcome::Pending;
        }

        let mut options = InvokeOptions::page(1)
            .with_size(self.page_size.load(Ordering::SeqCst))
            .with_filters(query.active_filters())
            .with_condition(query.condition);
        if let Some(order_by) = query.order_by() {
            options = options.with_order_by(order_by);
        }

        let result = self.datasource.invoke(options).await;
        if self.is_stale(generation) {
            log::debug!("Dropping response of superseded query {}", generation);
            return QueryOutcome::Superseded;
        }

        match result {
            Ok(response) => {
                lock(&self.state).last_applied = Some(key);
                QueryOutcome::Applied {
                    rows: add_unique_row_ids(response.data),
                    meta: response.pagination.or_else(|| self.datasource.pagination()),
                }
            }
            Err(err) => {
                let operation = if query.active_filters().is_empty() {
                    TableOperation::Sort
                } else {
                    TableOperation::Filter
                };
                log::error!("Server {} failed: {}", operation, err);
                let err = Error::from(err);
                self.events.on_toast(Toast::error(&self.messages.errormessage));
                self.events.on_error(operation, &err);
                QueryOutcome::Failed
            }
        }
    }
}

impl Drop for ServerQueryAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::datasource::FailOn;
    use crate::datasource::MemoryDatasource;

    fn datasource() -> Arc<MemoryDatasource> {
        let records = vec![
            json!({"id": 1, "name": "Cy"}),
            json!({"id": 2, "name": "Al"}),
            json!({"id": 3, "name": "Bo"}),
        ];
        Arc::new(MemoryDatasource::pageable(records))
    }

    fn by_name(desc: bool) -> ServerQuery {
        ServerQuery::new(vec![SortColumn::new("name", desc)], Vec::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_mount_and_unchanged_are_skipped() {
        let ds = datasource();
        let adapter = ServerQueryAdapter::new(ds.clone());
        assert_eq!(adapter.submit(by_name(false)).await, QueryOutcome::Skipped);
        assert_eq!(adapter.submit(by_name(false)).await, QueryOutcome::Unchanged);
        assert!(ds.invocations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_sends_trailing_query_only() {
        let ds = datasource();
        let adapter = ServerQueryAdapter::new(ds.clone());
        adapter.mark_applied(&ServerQuery::default());

        let (first, second) = tokio::join!(adapter.submit(by_name(false)), adapter.submit(by_name(true)));
        assert_eq!(first, QueryOutcome::Superseded);
        let QueryOutcome::Applied { rows, .. } = second else {
            panic!("expected applied, got {:?}", second);
        };
        assert_eq!(rows[0].display_value("name"), "Cy");

        let calls = ds.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].order_by.as_deref(), Some("name desc"));
        assert_eq!(calls[0].page, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_defers_query() {
        let ds = datasource();
        let adapter = ServerQueryAdapter::new(ds.clone());
        adapter.mark_applied(&ServerQuery::default());

        ds.set_loading(true);
        assert_eq!(adapter.submit(by_name(true)).await, QueryOutcome::Pending);
        assert!(ds.invocations().is_empty());

        ds.set_loading(false);
        let outcome = adapter.on_loading_complete().await;
        assert!(matches!(outcome, Some(QueryOutcome::Applied { .. })));
        assert_eq!(adapter.on_loading_complete().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported() {
        let ds = datasource();
        let adapter = ServerQueryAdapter::new(ds.clone());
        adapter.mark_applied(&ServerQuery::default());
        ds.fail_next(FailOn::Invoke);
        assert_eq!(adapter.submit(by_name(true)).await, QueryOutcome::Failed);
        // not applied, so the same query is sent again
        assert!(matches!(adapter.submit(by_name(true)).await, QueryOutcome::Applied { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_debounce() {
        let ds = datasource();
        let adapter = Arc::new(ServerQueryAdapter::new(ds.clone()));
        adapter.mark_applied(&ServerQuery::default());

        let task = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.submit(by_name(true)).await })
        };
        tokio::task::yield_now().await;
        adapter.dispose();
        assert_eq!(task.await.unwrap(), QueryOutcome::Cancelled);
        assert!(ds.invocations().is_empty());
    }
}
