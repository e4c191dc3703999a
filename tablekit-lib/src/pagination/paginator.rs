//! The pagination engine

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use super::Direction;
use super::NavigationMode;
use super::NavigationOutcome;
use super::PaginationState;
use super::reproject_selected;
use crate::config::Messages;
use crate::datasource::Datasource;
use crate::datasource::InvokeOptions;
use crate::datasource::PageMeta;
use crate::error::DatasourceError;
use crate::error::Error;
use crate::events::NoopEvents;
use crate::events::PageChange;
use crate::events::TableEvents;
use crate::events::TableOperation;
use crate::events::Toast;
use crate::model::Dataset;
use crate::model::Row;
use crate::model::add_unique_row_ids;
use crate::persistence::SelectedItem;
use crate::query::FilterSpec;
use crate::query::LogicalOp;
use crate::util::read_lock;
use crate::util::write_lock;

/// Sort and filter options forwarded with every server page fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    /// Order clause.
    pub order_by: Option<String>,
    /// Column filters.
    pub filter_fields: Vec<FilterSpec>,
    /// How filters combine.
    pub condition: LogicalOp,
}

#[derive(Debug)]
struct PagerState {
    /// 1-based.
    page: usize,
    page_size: usize,
    meta: Option<PageMeta>,
    error: Option<String>,
}

/// Clears the in-flight flag when a fetch ends, however it ends.
struct FetchGuard<'a>(&'a AtomicBool);

impl<'a> FetchGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Page navigation over local rows or a pageable datasource.
///
/// In client mode `rows` holds every row and pages are slices of it. In
/// server mode `rows` holds what the datasource returned for the current
/// page, or every page fetched so far in accumulating modes.
///
/// Navigation is optimistic: the page number moves before the fetch and
/// rolls back if it fails.
///
/// # Example
///
/// ```
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// use serde_json::json;
/// use tablekit_lib::model::{Dataset, add_unique_row_ids};
/// use tablekit_lib::pagination::{Direction, NavigationMode, NavigationOutcome, Paginator};
///
/// let rows = add_unique_row_ids((1..=12).map(|i| json!({"id": i})).collect::<Vec<_>>());
/// let pager = Paginator::new(NavigationMode::Basic, 5, Dataset::new(rows));
/// assert_eq!(pager.navigate_page(Direction::Last, false).await, NavigationOutcome::Navigated(3));
/// assert_eq!(pager.page_rows().len(), 2);
/// # });
/// ```
pub struct Paginator {
    mode: NavigationMode,
    rows: Dataset,
    state: RwLock<PagerState>,
    datasource: RwLock<Option<Arc<dyn Datasource>>>,
    server_paginated: AtomicBool,
    query: RwLock<PageQuery>,
    is_fetching: AtomicBool,
    events: Arc<dyn TableEvents>,
    messages: Messages,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("mode", &self.mode)
            .field("state", &*read_lock(&self.state))
            .field("server_paginated", &self.is_server_paginated())
            .finish_non_exhaustive()
    }
}

impl Paginator {
    /// Creates a client-side paginator over `rows`.
    pub fn new(mode: NavigationMode, page_size: usize, rows: Dataset) -> Self {
        Self {
            mode,
            rows,
            state: RwLock::new(PagerState {
                page: 1,
                page_size: page_size.max(1),
                meta: None,
                error: None,
            }),
            datasource: RwLock::new(None),
            server_paginated: AtomicBool::new(false),
            query: RwLock::new(PageQuery::default()),
            is_fetching: AtomicBool::new(false),
            events: Arc::new(NoopEvents),
            messages: Messages::default(),
        }
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

    /// Binds a datasource. `server_paginated` comes from its `IS_PAGEABLE`
    /// answer; without it pages are sliced locally.
    pub fn set_datasource(&self, datasource: Option<Arc<dyn Datasource>>, server_paginated: bool) {
        *write_lock(&self.datasource) = datasource;
        self.server_paginated
            .store(server_paginated, Ordering::SeqCst);
    }

    /// Returns `true` when pages are fetched from the datasource.
    pub fn is_server_paginated(&self) -> bool {
        self.server_paginated.load(Ordering::SeqCst) && read_lock(&self.datasource).is_some()
    }

    /// Sets the sort and filter options sent with server fetches.
    pub fn set_query(&self, query: PageQuery) {
        *write_lock(&self.query) = query;
    }

    /// Returns the navigation mode.
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// Returns the rows the paginator works on.
    pub fn rows(&self) -> &Dataset {
        &self.rows
    }

    /// Returns the 1-based current page.
    pub fn current_page(&self) -> usize {
        read_lock(&self.state).page
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        read_lock(&self.state).page_size
    }

    /// Returns the last fetch error, cleared by the next successful fetch.
    pub fn error(&self) -> Option<String> {
        read_lock(&self.state).error.clone()
    }

    /// Returns the server paging metadata of the last fetch.
    pub fn meta(&self) -> Option<PageMeta> {
        self.datasource()
            .and_then(|ds| ds.pagination())
            .or(read_lock(&self.state).meta)
            .filter(|_| self.is_server_paginated())
    }

    /// Returns the pagination snapshot.
    pub fn state(&self) -> PaginationState {
        let (page, page_size) = {
            let state = read_lock(&self.state);
            (state.page, state.page_size)
        };
        let (page_count, data_size) = match self.meta() {
            Some(meta) => (meta.total_pages.max(1), meta.total_elements),
            None => {
                let len = self.rows.len();
                (len.div_ceil(page_size).max(1), len)
            }
        };
        PaginationState {
            page_index: page - 1,
            page_size,
            page_count,
            data_size,
        }
    }

    /// Returns the number of pages, at least 1.
    pub fn page_count(&self) -> usize {
        self.state().page_count
    }

    /// Returns `true` on the first page.
    pub fn is_first_page(&self) -> bool {
        match self.meta() {
            Some(meta) => meta.first || self.current_page() <= 1,
            None => self.current_page() <= 1,
        }
    }

    /// Returns `true` on the last page.
    pub fn is_last_page(&self) -> bool {
        let page = self.current_page();
        match self.meta() {
            Some(meta) => meta.last || page >= meta.total_pages,
            None => page >= self.page_count(),
        }
    }

    /// Returns the rows currently shown.
    ///
    /// Client mode slices the current page; accumulating modes show every
    /// page up to the current one. Server mode shows what was fetched.
    pub fn page_rows(&self) -> Vec<Row> {
        let rows = self.rows.snapshot();
        if self.is_server_paginated() {
            return rows.to_vec();
        }
        let (page, size) = {
            let state = read_lock(&self.state);
            (state.page, state.page_size)
        };
        let start = if self.mode.is_accumulating() {
            0
        } else {
            ((page - 1) * size).min(rows.len())
        };
        let end = (page * size).min(rows.len());
        rows[start..end].to_vec()
    }

    /// Navigates in `direction`.
    ///
    /// `Prev`/`Next` do nothing at the boundaries. `First`/`Last` do nothing
    /// when already there unless `is_refresh`, which re-fetches the current
    /// page instead.
    pub async fn navigate_page(&self, direction: Direction, is_refresh: bool) -> NavigationOutcome {
        let current = self.current_page();
        let target = match direction {
            Direction::Prev if self.is_first_page() => return self.refresh_or_skip(is_refresh, current).await,
            Direction::Next if self.is_last_page() => return self.refresh_or_skip(is_refresh, current).await,
            Direction::Prev => current - 1,
            Direction::Next => current + 1,
            Direction::First => 1,
            Direction::Last => self.page_count(),
        };
        if target == current {
            return self.refresh_or_skip(is_refresh, current).await;
        }
        self.perform_page_navigation(target, current).await
    }

    async fn refresh_or_skip(&self, is_refresh: bool, current: usize) -> NavigationOutcome {
        if is_refresh {
            self.perform_page_navigation(current, current).await
        } else {
            NavigationOutcome::Unchanged
        }
    }

    /// Jumps to a 1-based page, clamped to the page count.
    pub async fn go_to_page(&self, page: usize) -> NavigationOutcome {
        let current = self.current_page();
        let target = page.clamp(1, self.page_count());
        if target == current {
            return NavigationOutcome::Unchanged;
        }
        self.perform_page_navigation(target, current).await
    }

    /// Moves to `new_page`, fetching it in server mode.
    ///
    /// The page number changes before the fetch; on failure it goes back
    /// to `previous_page`, the error is recorded and reported.
    pub async fn perform_page_navigation(&self, new_page: usize, previous_page: usize) -> NavigationOutcome {
        write_lock(&self.state).page = new_page.max(1);
        log::debug!("Navigating from page {} to page {}", previous_page, new_page);

        if self.is_server_paginated() {
            match self.fetch_page(new_page).await {
                Ok(rows) => self.rows.replace(rows),
                Err(err) => {
                    write_lock(&self.state).page = previous_page.max(1);
                    self.report_fetch_error(err);
                    return NavigationOutcome::RolledBack(previous_page);
                }
            }
        }

        write_lock(&self.state).error = None;
        self.notify_page_change();
        NavigationOutcome::Navigated(self.current_page())
    }

    /// Changes the page size and goes back to page 1.
    ///
    /// Returns `selected` reprojected onto the new page size.
    pub async fn handle_page_size_change(&self, new_size: usize, selected: &[SelectedItem]) -> Vec<SelectedItem> {
        let new_size = new_size.max(1);
        let old_size = {
            let mut state = write_lock(&self.state);
            let old = state.page_size;
            state.page_size = new_size;
            old
        };
        if let Some(datasource) = self.datasource().filter(|ds| ds.supports_max_results()) {
            datasource.set_max_results(new_size);
        }
        log::debug!("Page size changed from {} to {}", old_size, new_size);

        self.perform_page_navigation(1, 1).await;
        reproject_selected(selected, old_size, new_size)
    }

    /// Fetches the next page and appends it (accumulating modes).
    ///
    /// Returns [`NavigationOutcome::AlreadyFetching`] immediately when a
    /// fetch is in flight.
    pub async fn load_more_data(&self) -> NavigationOutcome {
        let Some(_guard) = FetchGuard::acquire(&self.is_fetching) else {
            log::debug!("Load more skipped, fetch in flight");
            return NavigationOutcome::AlreadyFetching;
        };
        if self.is_last_page() {
            return NavigationOutcome::Unchanged;
        }
        let next = self.current_page() + 1;

        if self.is_server_paginated() {
            match self.fetch_page(next).await {
                Ok(rows) => {
                    self.rows.update(|all| append_retagged(all, rows));
                }
                Err(err) => {
                    self.report_fetch_error(err);
                    return NavigationOutcome::Unchanged;
                }
            }
        }

        {
            let mut state = write_lock(&self.state);
            state.page = next;
            state.error = None;
        }
        self.notify_page_change();
        NavigationOutcome::Navigated(next)
    }

    /// Truncates accumulated rows back to page 1.
    pub async fn reset_accumulated_data(&self) -> NavigationOutcome {
        let current = self.current_page();
        self.perform_page_navigation(1, current).await
    }

    /// Scroll sentinel became visible: loads more when there is more.
    pub async fn on_sentinel_visible(&self) -> NavigationOutcome {
        if !self.mode.is_accumulating() || self.is_last_page() {
            return NavigationOutcome::Unchanged;
        }
        self.load_more_data().await
    }

    /// Installs rows fetched elsewhere (e.g. after a server sort) as `page`.
    pub fn apply_server_page(&self, page: usize, rows: Vec<Row>, meta: Option<PageMeta>) {
        {
            let mut state = write_lock(&self.state);
            state.page = page.max(1);
            state.meta = meta;
            state.error = None;
        }
        self.rows.replace(rows);
        self.notify_page_change();
    }

    /// Pulls the current page back into range after local rows shrank.
    pub fn clamp_page(&self) {
        if self.is_server_paginated() {
            return;
        }
        let count = self.page_count();
        let mut state = write_lock(&self.state);
        if state.page > count {
            state.page = count;
        }
    }

    /// Sets the current page without fetching (state restore).
    pub fn set_page(&self, page: usize) {
        write_lock(&self.state).page = page.max(1);
    }

    /// Sets the page size without fetching (state restore).
    pub fn set_page_size(&self, size: usize) {
        write_lock(&self.state).page_size = size.max(1);
    }

    fn datasource(&self) -> Option<Arc<dyn Datasource>> {
        read_lock(&self.datasource).clone()
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<Row>, DatasourceError> {
        let Some(datasource) = self.datasource() else {
            return Err(DatasourceError::unsupported("fetch without datasource"));
        };
        let size = self.page_size();
        let query = read_lock(&self.query).clone();
        let mut options = InvokeOptions::page(page)
            .with_size(size)
            .with_filters(query.filter_fields)
            .with_condition(query.condition);
        if let Some(order_by) = query.order_by {
            options = options.with_order_by(order_by);
        }

        let response = datasource.invoke(options).await?;
        write_lock(&self.state).meta = response.pagination.or_else(|| datasource.pagination());
        Ok(add_unique_row_ids(response.data))
    }

    fn report_fetch_error(&self, err: DatasourceError) {
        log::error!("Page fetch failed: {}", err);
        write_lock(&self.state).error = Some(err.to_string());
        let err = Error::from(err);
        self.events.on_error(TableOperation::Fetch, &err);
        self.events.on_toast(Toast::error(&self.messages.errormessage));
    }

    fn notify_page_change(&self) {
        let change = PageChange {
            page: self.current_page(),
            page_size: self.page_size(),
            rows: self.page_rows(),
        };
        self.events.on_pagination_change(&change);
        self.events.on_set_record(&change);
    }
}

/// Appends a fetched page, keeping ids unique across pages.
fn append_retagged(all: &mut Vec<Row>, page: Vec<Row>) {
    let offset = all.len();
    for (i, row) in page.into_iter().enumerate() {
        if all.iter().any(|existing| existing.id() == row.id()) {
            let id = format!("{}-{}", row.id(), offset + i);
            all.push(Row::new(id.into(), row.into_fields()));
        } else {
            all.push(row);
        }
    }
}
