//! The data table
//!
//! [`DataTable`] ties the engines together for one table widget: it owns
//! the committed rows, the filtered and sorted view the paginator pages
//! through, the selection, the editor and the persisted state.
//!
//! In client mode the view is derived from the committed rows. In server
//! mode the datasource filters, sorts and pages, and the view is whatever
//! page it returned.

mod editing;
mod persist;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Map;
use serde_json::Value;

use crate::cell_state::CellState;
use crate::columns::ColumnOverrides;
use crate::config::TableConfig;
use crate::datasource::Datasource;
use crate::datasource::InvokeOptions;
use crate::datasource::Operation;
use crate::edit::TableEditor;
use crate::edited_rows::EditedRows;
use crate::error::Error;
use crate::events::NoopEvents;
use crate::events::TableEvents;
use crate::events::TableOperation;
use crate::events::Toast;
use crate::export::ExportRequest;
use crate::model::Column;
use crate::model::Dataset;
use crate::model::DeviceClass;
use crate::model::Row;
use crate::model::RowId;
use crate::model::add_unique_row_ids;
use crate::pagination::Direction;
use crate::pagination::NavigationOutcome;
use crate::pagination::PaginationState;
use crate::pagination::Paginator;
use crate::persistence::SelectedItem;
use crate::persistence::StateField;
use crate::persistence::StateStorage;
use crate::persistence::TableStateManager;
use crate::query::FilterSpec;
use crate::query::LogicalOp;
use crate::query::SortColumn;
use crate::query::row_matches;
use crate::query::sort_rows;
use crate::registry::ChangeListener;
use crate::selection::ClickTarget;
use crate::selection::RestoreRows;
use crate::selection::RowSelection;
use crate::selection::SelectionMode;
use crate::server::QueryOutcome;
use crate::server::ServerQuery;
use crate::server::ServerQueryAdapter;
use crate::util::lock;
use crate::util::read_lock;
use crate::util::write_lock;

/// Shared handle to a table, as registered with the widget registry.
pub type TableHandle = Arc<DataTable>;

/// Listener property carrying the selection.
pub const SELECTED_ITEM_PROPERTY: &str = "selecteditem";

/// One table widget.
///
/// # Example
///
/// ```
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// use serde_json::json;
/// use tablekit_lib::config::TableConfig;
/// use tablekit_lib::model::Column;
/// use tablekit_lib::pagination::Direction;
/// use tablekit_lib::table::DataTable;
///
/// let table = DataTable::new(TableConfig::new("people").with_page_size(2), vec![Column::new("name", "Name")]);
/// table.set_dataset((1..=5).map(|i| json!({"id": i, "name": format!("P{}", i)})).collect()).await;
/// table.mount().await.unwrap();
///
/// table.navigate(Direction::Last).await;
/// assert_eq!(table.pagination().page(), 3);
/// assert_eq!(table.page_rows().len(), 1);
/// # });
/// ```
pub struct DataTable {
    config: TableConfig,
    columns: ColumnOverrides,
    /// Committed rows; the editor works on these.
    dataset: Dataset,
    /// Rows the paginator pages through.
    view: Dataset,
    paginator: Paginator,
    editor: TableEditor,
    cell_state: CellState,
    selection: RwLock<RowSelection>,
    selected_items: RwLock<Vec<SelectedItem>>,
    filters: RwLock<Vec<FilterSpec>>,
    sorting: RwLock<Vec<SortColumn>>,
    state_manager: Mutex<TableStateManager>,
    storage: Option<Arc<dyn StateStorage>>,
    datasource: RwLock<Option<Arc<dyn Datasource>>>,
    server: RwLock<Option<Arc<ServerQueryAdapter>>>,
    /// Server mode: the query the shown rows answer.
    applied_query: RwLock<ServerQuery>,
    listener: Option<Arc<dyn ChangeListener>>,
    events: Arc<dyn TableEvents>,
    mounted: AtomicBool,
    disposed: AtomicBool,
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("name", &self.config.name)
            .field("paginator", &self.paginator)
            .field("editor", &self.editor)
            .finish_non_exhaustive()
    }
}

impl DataTable {
    /// Creates a table with no rows.
    pub fn new(config: TableConfig, columns: Vec<Column>) -> Self {
        let dataset = Dataset::default();
        let view = Dataset::default();
        let edits = EditedRows::new();
        let mode = config.selection_mode();
        let paginator = Paginator::new(config.navigation, config.pagesize, view.clone())
            .with_messages(config.messages.clone());
        let editor = TableEditor::new(config.editmode, columns.clone(), dataset.clone(), edits)
            .with_messages(config.messages.clone())
            .with_page_size(config.pagesize);

        Self {
            columns: ColumnOverrides::new(columns),
            dataset,
            view,
            paginator,
            editor,
            cell_state: CellState::new(config.name.clone()),
            selection: RwLock::new(RowSelection::new(mode).with_first_row_select(config.gridfirstrowselect)),
            selected_items: RwLock::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
            sorting: RwLock::new(Vec::new()),
            state_manager: Mutex::new(TableStateManager::new(config.pagesize, mode)),
            storage: None,
            datasource: RwLock::new(None),
            server: RwLock::new(None),
            applied_query: RwLock::new(ServerQuery::default()),
            listener: None,
            events: Arc::new(NoopEvents),
            mounted: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            config,
        }
    }

    /// Sets the host callbacks.
    pub fn with_events(mut self, events: Arc<dyn TableEvents>) -> Self {
        self.paginator = self.paginator.with_events(events.clone());
        self.editor = self.editor.with_events(events.clone());
        self.events = events;
        self
    }

    /// Sets where table state is persisted.
    pub fn with_storage(mut self, storage: Arc<dyn StateStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the listener receiving `selecteditem` changes.
    pub fn with_listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Binds a datasource. Whether it pages is asked at [`mount`](Self::mount).
    pub fn with_datasource(self, datasource: Arc<dyn Datasource>) -> Self {
        *write_lock(&self.datasource) = Some(datasource);
        self
    }

    /// Uses `cell_state` instead of a private store, e.g. one handed out
    /// by a [`CellStateRegistry`](crate::cell_state::CellStateRegistry).
    pub fn with_cell_state(mut self, cell_state: CellState) -> Self {
        self.cell_state = cell_state;
        self
    }

    /// Wraps the table in a shareable handle.
    pub fn into_handle(self) -> TableHandle {
        Arc::new(self)
    }

    /// Returns the widget name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns the column store.
    pub fn columns(&self) -> &ColumnOverrides {
        &self.columns
    }

    /// Returns the columns shown on `device`.
    pub fn visible_columns(&self, device: DeviceClass) -> Vec<Column> {
        self.columns
            .columns()
            .into_iter()
            .filter(|column| column.is_visible_on(device))
            .collect()
    }

    /// Returns the bound datasource.
    pub fn datasource(&self) -> Option<Arc<dyn Datasource>> {
        read_lock(&self.datasource).clone()
    }

    /// Returns the per-table cell store.
    pub fn cell_state(&self) -> &CellState {
        &self.cell_state
    }

    /// Returns the committed rows.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Returns the paginator.
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Returns the editor.
    pub fn editor(&self) -> &TableEditor {
        &self.editor
    }

    /// Returns the pagination snapshot.
    pub fn pagination(&self) -> PaginationState {
        self.paginator.state()
    }

    /// Returns the rows currently shown.
    pub fn page_rows(&self) -> Vec<Row> {
        self.paginator.page_rows()
    }

    /// Returns `true` when pages come from the datasource.
    pub fn is_server_paginated(&self) -> bool {
        self.paginator.is_server_paginated()
    }

    /// Returns `true` once [`mount`](Self::mount) ran.
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Returns `true` once disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Replaces the rows of a table bound to plain data.
    pub async fn set_dataset(&self, values: Vec<Value>) {
        self.dataset.replace(add_unique_row_ids(values));
        self.after_data_change();
        self.persist_state().await;
    }

    /// Restores persisted state and loads the first page.
    ///
    /// Persisted page size only applies if it was saved against the current
    /// default page size. Selection is restored by position: across every
    /// page for local data, on the current page for server data.
    pub async fn mount(&self) -> Result<(), Error> {
        let restored = self.load_state().await;
        lock(&self.state_manager).restore(restored.clone());

        let page_size = restored
            .effective_page_size(self.config.pagesize)
            .unwrap_or(self.config.pagesize);
        self.paginator.set_page_size(page_size);
        self.editor.set_page_size(page_size);
        *write_lock(&self.filters) = restored.search.clone();
        *write_lock(&self.sorting) = restored.sort.iter().map(SortColumn::from).collect();
        self.editor.set_sorting(read_lock(&self.sorting).clone());
        let page = restored.pagination.unwrap_or(1);

        match self.datasource() {
            Some(datasource) if datasource.is_pageable().await => {
                self.mount_server(datasource, page, page_size).await;
            }
            Some(datasource) => {
                self.editor.set_datasource(Some(datasource.clone()));
                self.load_all(datasource.as_ref()).await?;
                self.mount_client(page);
            }
            None => self.mount_client(page),
        }

        let scope = if self.is_server_paginated() {
            RestoreRows::Page(self.paginator.current_page())
        } else {
            RestoreRows::AllPages
        };
        let rows = self.view.snapshot();
        let restored_ids = write_lock(&self.selection).restore(&restored.selected_item, &rows, page_size, scope);
        *write_lock(&self.selected_items) = if restored_ids.is_empty() {
            Vec::new()
        } else {
            restored.selected_item.clone()
        };
        log::debug!(
            "Mounted table {} on page {} with {} restored selections",
            self.config.name,
            self.paginator.current_page(),
            restored_ids.len()
        );

        self.mounted.store(true, Ordering::SeqCst);
        let first = write_lock(&self.selection).apply_first_row_select(&self.page_rows());
        if first.is_some() {
            self.on_selection_changed().await;
        } else {
            self.mirror_selection();
            self.notify_selection();
        }
        Ok(())
    }

    async fn mount_server(&self, datasource: Arc<dyn Datasource>, page: usize, page_size: usize) {
        let query = self.server_query();
        let adapter = ServerQueryAdapter::new(datasource.clone())
            .with_debounce(self.config.query_debounce)
            .with_events(self.events.clone())
            .with_messages(self.config.messages.clone());
        adapter.set_page_size(page_size);
        adapter.mark_applied(&query);
        *write_lock(&self.server) = Some(Arc::new(adapter));

        if datasource.supports_max_results() {
            datasource.set_max_results(page_size);
        }
        self.paginator.set_datasource(Some(datasource.clone()), true);
        self.paginator.set_query(query.page_query());
        self.editor.set_datasource(Some(datasource));
        *write_lock(&self.applied_query) = query;

        if let NavigationOutcome::RolledBack(_) = self.paginator.perform_page_navigation(page, 1).await {
            // the restored page is gone; fall back to the first one
            self.paginator.perform_page_navigation(1, 1).await;
        }
        self.adopt_fetched();
    }

    fn mount_client(&self, page: usize) {
        self.rebuild_view();
        self.paginator.set_page(page);
        self.paginator.clamp_page();
    }

    async fn load_all(&self, datasource: &dyn Datasource) -> Result<(), Error> {
        let options = InvokeOptions::default();
        match datasource.invoke(options).await {
            Ok(response) => {
                self.dataset.replace(add_unique_row_ids(response.data));
                Ok(())
            }
            Err(err) if err.is_parse() => {
                log::error!("Ignoring malformed response: {}", err);
                self.dataset.replace(Vec::new());
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to load table {}: {}", self.config.name, err);
                let err = Error::from(err);
                self.events.on_toast(Toast::error(&self.config.messages.errormessage));
                self.events.on_error(TableOperation::Fetch, &err);
                Err(err)
            }
        }
    }

    /// Navigates in `direction`.
    pub async fn navigate(&self, direction: Direction) -> NavigationOutcome {
        let outcome = self.paginator.navigate_page(direction, false).await;
        self.after_navigation(outcome).await
    }

    /// Jumps to a 1-based page.
    pub async fn go_to_page(&self, page: usize) -> NavigationOutcome {
        let outcome = self.paginator.go_to_page(page).await;
        self.after_navigation(outcome).await
    }

    /// Loads the next chunk in scroll and on-demand modes.
    pub async fn load_more(&self) -> NavigationOutcome {
        let outcome = self.paginator.load_more_data().await;
        if let NavigationOutcome::Navigated(_) = outcome {
            self.adopt_fetched();
        }
        outcome
    }

    /// The scroll sentinel became visible.
    pub async fn on_sentinel_visible(&self) -> NavigationOutcome {
        let outcome = self.paginator.on_sentinel_visible().await;
        if let NavigationOutcome::Navigated(_) = outcome {
            self.adopt_fetched();
        }
        outcome
    }

    async fn after_navigation(&self, outcome: NavigationOutcome) -> NavigationOutcome {
        if let NavigationOutcome::Navigated(_) = outcome {
            self.adopt_fetched();
            lock(&self.state_manager).touch(StateField::Pagination);
            self.persist_state().await;
        }
        outcome
    }

    /// Changes the page size, going back to page 1 and reprojecting the
    /// persisted selection onto the new size.
    pub async fn change_page_size(&self, size: usize) -> NavigationOutcome {
        let selected = read_lock(&self.selected_items).clone();
        let reprojected = self.paginator.handle_page_size_change(size, &selected).await;
        *write_lock(&self.selected_items) = reprojected;
        self.editor.set_page_size(size);
        if let Some(server) = self.server_adapter() {
            server.set_page_size(size);
        }
        self.adopt_fetched();
        {
            let mut manager = lock(&self.state_manager);
            manager.touch(StateField::PageSize);
            manager.touch(StateField::Pagination);
        }
        self.persist_state().await;
        NavigationOutcome::Navigated(self.paginator.current_page())
    }

    /// Returns the current filters.
    pub fn filters(&self) -> Vec<FilterSpec> {
        read_lock(&self.filters).clone()
    }

    /// Returns the current sorting.
    pub fn sorting(&self) -> Vec<SortColumn> {
        read_lock(&self.sorting).clone()
    }

    /// Replaces the column filters and goes back to page 1.
    ///
    /// A failed server query puts back the filters of the rows shown.
    pub async fn set_filters(&self, filters: Vec<FilterSpec>) -> Option<QueryOutcome> {
        *write_lock(&self.filters) = filters;
        self.apply_query(None).await
    }

    /// Replaces the sorting and goes back to page 1.
    ///
    /// A failed server query puts back the sorting of the rows shown.
    pub async fn set_sorting(&self, sorting: Vec<SortColumn>) -> Option<QueryOutcome> {
        *write_lock(&self.sorting) = sorting.clone();
        self.editor.set_sorting(sorting);
        self.apply_query(Some(StateField::Sort)).await
    }

    /// Sorts by one column; a second click on the same column flips the
    /// direction.
    pub async fn sort_by(&self, field: &str) -> Option<QueryOutcome> {
        let desc = read_lock(&self.sorting)
            .first()
            .is_some_and(|column| column.id == field && !column.desc);
        self.set_sorting(vec![SortColumn::new(field, desc)]).await
    }

    /// Applies the current filters and sorting. Server tables return the
    /// query outcome; client tables re-derive the view and return `None`.
    async fn apply_query(&self, changed: Option<StateField>) -> Option<QueryOutcome> {
        let outcome = match self.server_adapter() {
            Some(server) => {
                let query = self.server_query();
                let outcome = server.submit(query.clone()).await;
                if !self.apply_server_outcome(query, &outcome) {
                    // the stored state still matches the rows shown
                    return Some(outcome);
                }
                Some(outcome)
            }
            None => {
                self.rebuild_view();
                let current = self.paginator.current_page();
                self.paginator.perform_page_navigation(1, current).await;
                self.sync_selected_items(true);
                None
            }
        };
        {
            let mut manager = lock(&self.state_manager);
            if let Some(field) = changed {
                manager.touch(field);
            }
            manager.touch(StateField::Pagination);
        }
        self.persist_state().await;
        outcome
    }

    /// Shows the rows of an applied server query. A failed query reverts
    /// the sorting and filters and returns `false`.
    fn apply_server_outcome(&self, query: ServerQuery, outcome: &QueryOutcome) -> bool {
        match outcome {
            QueryOutcome::Applied { rows, meta } => {
                self.paginator.set_query(query.page_query());
                self.paginator.apply_server_page(1, rows.clone(), *meta);
                self.adopt_fetched();
                *write_lock(&self.applied_query) = query;
                self.sync_selected_items(true);
                true
            }
            QueryOutcome::Failed => {
                self.revert_query();
                false
            }
            _ => true,
        }
    }

    fn revert_query(&self) {
        let applied = read_lock(&self.applied_query).clone();
        log::warn!(
            "Query of table {} failed, keeping sorting {:?} and {} filters",
            self.config.name,
            applied.order_by(),
            applied.filters.len()
        );
        self.editor.set_sorting(applied.sorting.clone());
        *write_lock(&self.sorting) = applied.sorting;
        *write_lock(&self.filters) = applied.filters;
    }

    /// Re-applies a query deferred while the datasource was loading.
    pub async fn on_datasource_loaded(&self) -> Option<QueryOutcome> {
        let server = self.server_adapter()?;
        let outcome = server.on_loading_complete().await?;
        if self.apply_server_outcome(self.server_query(), &outcome) {
            lock(&self.state_manager).touch(StateField::Pagination);
            self.persist_state().await;
        }
        Some(outcome)
    }

    /// Re-fetches or re-derives the current page.
    pub async fn refresh(&self) -> Result<(), Error> {
        if self.is_server_paginated() {
            let current = self.paginator.current_page();
            self.paginator.perform_page_navigation(current, current).await;
            self.adopt_fetched();
            self.sync_selected_items(false);
        } else {
            if let Some(datasource) = self.datasource() {
                self.load_all(datasource.as_ref()).await?;
            }
            self.after_data_change();
        }
        Ok(())
    }

    /// Returns the selected row ids in selection order.
    pub fn selected_ids(&self) -> Vec<RowId> {
        read_lock(&self.selection).selected().to_vec()
    }

    /// Returns the selected rows that are loaded.
    pub fn selected_rows(&self) -> Vec<Row> {
        let rows = self.view.snapshot();
        self.selected_ids()
            .iter()
            .filter_map(|id| rows.iter().find(|row| row.id() == id).cloned())
            .collect()
    }

    /// Returns the persisted selection records.
    pub fn selected_items(&self) -> Vec<SelectedItem> {
        read_lock(&self.selected_items).clone()
    }

    /// Handles a click on a row: updates the selection and, in quick-edit
    /// mode, starts editing. Returns `true` if the selection changed.
    pub async fn handle_row_click(&self, target: &ClickTarget, row_id: &RowId) -> bool {
        let changed = write_lock(&self.selection).handle_row_selection_click(target, row_id);
        if !target.is_interactive() {
            if let Some(row) = self.dataset.find(row_id) {
                self.sync_editor_columns();
                self.editor.handle_row_click(&row);
            }
        }
        if changed {
            self.on_selection_changed().await;
        }
        changed
    }

    /// Selects every row of the dataset, or clears the selection. Multi
    /// select only. Every selected row is persisted by its position.
    pub async fn select_all(&self, select: bool) -> bool {
        let ids: Vec<RowId> = self.view.snapshot().iter().map(|row| row.id().clone()).collect();
        let changed = write_lock(&self.selection).handle_select_all(select, &ids);
        if changed {
            if !select {
                write_lock(&self.selected_items).clear();
            }
            self.on_selection_changed().await;
        }
        changed
    }

    /// Selects one row programmatically.
    pub async fn select_row(&self, row_id: &RowId) -> bool {
        let (added, _) = {
            let mut selection = write_lock(&self.selection);
            match selection.mode() {
                SelectionMode::None => return false,
                SelectionMode::Radio => selection.select(row_id),
                SelectionMode::Multi if selection.is_selected(row_id) => return false,
                SelectionMode::Multi => selection.toggle(row_id),
            }
        };
        if !added.is_empty() {
            self.on_selection_changed().await;
        }
        !added.is_empty()
    }

    async fn on_selection_changed(&self) {
        self.sync_selected_items(false);
        lock(&self.state_manager).touch(StateField::Selection);
        self.mirror_selection();
        self.notify_selection();
        self.persist_state().await;
    }

    /// Recomputes the persisted positions from the selected ids.
    ///
    /// Client mode locates every id in the whole view. Server mode only
    /// has the current page loaded; `reordered` drops the records of other
    /// pages, which no longer point at the same rows.
    fn sync_selected_items(&self, reordered: bool) {
        let items = if self.is_server_paginated() {
            let existing = if reordered { Vec::new() } else { self.selected_items() };
            let page_rows = self.page_rows();
            read_lock(&self.selection).persisted_items(self.paginator.current_page(), &page_rows, &existing)
        } else {
            let rows = self.view.snapshot();
            read_lock(&self.selection).positions(&rows, self.paginator.page_size())
        };
        *write_lock(&self.selected_items) = items;
    }

    fn mirror_selection(&self) {
        let ids: Vec<Value> = self
            .selected_ids()
            .into_iter()
            .map(|id| Value::String(id.to_string()))
            .collect();
        self.cell_state.set_value(&["selection"], Value::Array(ids));
    }

    fn notify_selection(&self) {
        let Some(listener) = &self.listener else {
            return;
        };
        let rows: Vec<Value> = self.selected_rows().iter().map(Row::to_value).collect();
        let value = match self.config.selection_mode() {
            SelectionMode::Multi => Value::Array(rows),
            SelectionMode::Radio | SelectionMode::None => rows.into_iter().next().unwrap_or(Value::Null),
        };
        let mut patch = Map::new();
        patch.insert(SELECTED_ITEM_PROPERTY.to_string(), value);
        listener.on_change(&self.config.name, &patch);
    }

    /// Asks the datasource for an export of the current query.
    pub async fn export(&self, export_type: &str, export_size: Option<usize>) -> Result<Value, Error> {
        let Some(datasource) = self.datasource() else {
            log::warn!("Cannot export table {}: no datasource", self.config.name);
            return Err(Error::misuse("export needs a datasource"));
        };
        let request = ExportRequest::build(
            &self.columns.columns(),
            &self.filters(),
            &self.sorting(),
            export_type,
            export_size,
        );
        match datasource.execute(Operation::Download(request)).await {
            Ok(value) => Ok(value),
            Err(err) => {
                log::error!("Export of table {} failed: {}", self.config.name, err);
                let err = Error::from(err);
                self.events.on_toast(Toast::error(&self.config.messages.errormessage));
                self.events.on_error(TableOperation::Export, &err);
                Err(err)
            }
        }
    }

    /// Returns the aggregates of columns that declare one.
    pub fn aggregate_row(&self) -> Map<String, Value> {
        self.columns.aggregate_row(&self.dataset)
    }

    /// Cancels pending queries and drops per-table caches.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(server) = self.server_adapter() {
            server.dispose();
        }
        self.editor.cancel_editing();
        self.cell_state.clear_state();
        log::debug!("Disposed table {}", self.config.name);
    }

    fn server_adapter(&self) -> Option<Arc<ServerQueryAdapter>> {
        read_lock(&self.server).clone()
    }

    fn server_query(&self) -> ServerQuery {
        ServerQuery::new(self.sorting(), self.filters())
    }

    /// Re-derives the view after the committed rows changed.
    fn after_data_change(&self) {
        let dropped = {
            let rows = self.dataset.snapshot();
            write_lock(&self.selection).retain_existing(&rows)
        };
        if !dropped.is_empty() {
            log::debug!("Dropped {} selections of removed rows", dropped.len());
        }
        self.rebuild_view();
        self.paginator.clamp_page();
        if !self.is_mounted() {
            return;
        }
        let first = write_lock(&self.selection).apply_first_row_select(&self.page_rows());
        self.sync_selected_items(false);
        if first.is_some() || !dropped.is_empty() {
            self.mirror_selection();
            self.notify_selection();
        }
    }

    /// Client mode: filter and sort the committed rows into the view.
    /// Server mode: the view is the committed page.
    fn rebuild_view(&self) {
        let mut rows = self.dataset.snapshot().to_vec();
        if !self.is_server_paginated() {
            let filters = self.filters();
            rows.retain(|row| row_matches(row, &filters, LogicalOp::And));
            sort_rows(&mut rows, &self.sorting());
        }
        self.view.replace(rows);
    }

    /// Server mode: what the paginator fetched becomes the committed page.
    fn adopt_fetched(&self) {
        if self.is_server_paginated() {
            self.dataset.replace(self.view.snapshot().to_vec());
        }
    }

    fn sync_editor_columns(&self) {
        self.editor.set_columns(self.columns.columns());
    }
}

#[cfg(test)]
mod tests;
