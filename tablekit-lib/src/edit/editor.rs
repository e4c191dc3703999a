//! The row edit engine

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::Map;
use serde_json::Value;

use super::EditKey;
use super::EditMode;
use super::EditPolicy;
use super::ValidationState;
use super::validate_row;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::config::Messages;
use crate::datasource::Datasource;
use crate::edited_rows::EditedRows;
use crate::error::DatasourceError;
use crate::error::Error;
use crate::error::FieldIssue;
use crate::error::ValidationError;
use crate::events::NoopEvents;
use crate::events::TableEvents;
use crate::events::TableOperation;
use crate::events::Toast;
use crate::model::Column;
use crate::model::Dataset;
use crate::model::Row;
use crate::model::RowId;
use crate::model::display_string;
use crate::query::SortColumn;
use crate::query::sort_rows;
use crate::util::read_lock;
use crate::util::write_lock;

/// What an edit session edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    /// A committed row.
    Existing(RowId),
    /// The add-new-row form.
    NewRow,
}

impl EditTarget {
    /// Returns the id edits are keyed by; `"new-row"` for the form.
    pub fn row_id(&self) -> RowId {
        match self {
            Self::Existing(id) => id.clone(),
            Self::NewRow => RowId::new_row(),
        }
    }
}

/// An open edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    /// What is edited.
    pub target: EditTarget,
    /// Committed values when the session started, for the dirty check.
    pub original: Map<String, Value>,
    /// Current values.
    pub working: Map<String, Value>,
    /// Bumped on every session start so editable cells remount.
    pub render_session: u64,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed; no request was made.
    NoChanges,
    /// An existing row was updated.
    Updated(RowId),
    /// A new row was inserted and lives on this 1-based page.
    Inserted {
        /// Id of the inserted row.
        row_id: RowId,
        /// Page holding the row.
        page: usize,
    },
}

/// Result of [`TableEditor::handle_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key does not apply.
    Ignored,
    /// Enter saved the row.
    Saved(SaveOutcome),
    /// Enter tried to save; the session stays open.
    SaveFailed,
    /// Escape cancelled the session.
    Cancelled,
}

/// Runs edit sessions over a committed dataset.
///
/// Every field change is written synchronously to the session's working
/// copy and to [`EditedRows`], so a save always sees the latest value.
/// Saves are optimistic: the dataset changes first and is rolled back if the
/// datasource rejects the change.
pub struct TableEditor {
    mode: EditMode,
    policy: EditPolicy,
    columns: RwLock<Vec<Column>>,
    dataset: Dataset,
    edits: EditedRows,
    datasource: RwLock<Option<Arc<dyn Datasource>>>,
    session: RwLock<Option<EditSession>>,
    render_session: AtomicU64,
    validation: RwLock<ValidationState>,
    sorting: RwLock<Vec<SortColumn>>,
    page_size: AtomicUsize,
    events: Arc<dyn TableEvents>,
    messages: Messages,
}

impl std::fmt::Debug for TableEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEditor")
            .field("mode", &self.mode)
            .field("session", &*read_lock(&self.session))
            .finish_non_exhaustive()
    }
}

impl TableEditor {
    /// Creates an editor over `dataset`.
    pub fn new(mode: EditMode, columns: Vec<Column>, dataset: Dataset, edits: EditedRows) -> Self {
        Self {
            mode,
            policy: mode.policy(),
            columns: RwLock::new(columns),
            dataset,
            edits,
            datasource: RwLock::new(None),
            session: RwLock::new(None),
            render_session: AtomicU64::new(0),
            validation: RwLock::new(ValidationState::new()),
            sorting: RwLock::new(Vec::new()),
            page_size: AtomicUsize::new(DEFAULT_PAGE_SIZE),
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

    /// Sets the page size used to locate inserted rows.
    pub fn with_page_size(self, size: usize) -> Self {
        self.set_page_size(size);
        self
    }

    /// Binds the datasource receiving inserts, updates and deletes.
    pub fn set_datasource(&self, datasource: Option<Arc<dyn Datasource>>) {
        *write_lock(&self.datasource) = datasource;
    }

    /// Replaces the column definitions.
    pub fn set_columns(&self, columns: Vec<Column>) {
        *write_lock(&self.columns) = columns;
    }

    /// Sets the active sort, used to locate inserted rows.
    pub fn set_sorting(&self, sorting: Vec<SortColumn>) {
        *write_lock(&self.sorting) = sorting;
    }

    /// Sets the page size.
    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size.max(1), Ordering::SeqCst);
    }

    /// Returns the edit mode.
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Returns the edit policy.
    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Returns the edited-rows registry.
    pub fn edits(&self) -> &EditedRows {
        &self.edits
    }

    /// Returns a copy of the open session.
    pub fn session(&self) -> Option<EditSession> {
        read_lock(&self.session).clone()
    }

    /// Returns `true` while `row_id` is being edited.
    pub fn is_editing(&self, row_id: &RowId) -> bool {
        read_lock(&self.session)
            .as_ref()
            .is_some_and(|s| &s.target.row_id() == row_id)
    }

    /// Returns `true` while the new-row form is being edited.
    pub fn is_adding_new_row(&self) -> bool {
        read_lock(&self.session)
            .as_ref()
            .is_some_and(|s| s.target == EditTarget::NewRow)
    }

    /// Returns the current render session counter.
    pub fn render_session(&self) -> u64 {
        self.render_session.load(Ordering::SeqCst)
    }

    /// Returns the issues recorded for a row, by field.
    pub fn validation_issues(&self, row_id: &RowId) -> HashMap<String, FieldIssue> {
        read_lock(&self.validation).row_issues(row_id)
    }

    /// Returns `true` if a field is flagged invalid.
    pub fn is_invalid(&self, row_id: &RowId, field: &str) -> bool {
        read_lock(&self.validation).is_invalid(row_id, field)
    }

    /// Flags a field invalid on behalf of its widget. Blocks saving until
    /// cleared.
    pub fn mark_invalid(&self, row_id: &RowId, field: &str, message: impl Into<String>) {
        write_lock(&self.validation).mark_invalid(row_id, field, message);
    }

    /// Clears a widget's invalid flag.
    pub fn clear_marker(&self, row_id: &RowId, field: &str) {
        write_lock(&self.validation).clear_marker(row_id, field);
    }

    /// Starts editing `row`, resuming any pending edits of it.
    ///
    /// Returns the new render session.
    pub fn start_editing(&self, row: &Row) -> Result<u64, Error> {
        if self.mode == EditMode::None {
            log::warn!("Cannot edit row {}: table is not editable", row.id());
            return Err(Error::misuse("table is not editable"));
        }
        let row_id = row.id().clone();

        let adding = self.is_adding_new_row();
        if adding && self.policy.cancel_new_row_on_other_edit {
            log::debug!("Cancelling new row to edit {}", row_id);
            self.clear_row_state(&RowId::new_row());
        }

        let mut working = row.fields().clone();
        if let Some(pending) = self.edits.get_edits(&row_id) {
            working.extend(pending);
        }
        write_lock(&self.validation).clear_row(&row_id);

        let render_session = self.render_session.fetch_add(1, Ordering::SeqCst) + 1;
        *write_lock(&self.session) = Some(EditSession {
            target: EditTarget::Existing(row_id),
            original: row.fields().clone(),
            working,
            render_session,
        });
        Ok(render_session)
    }

    /// Starts editing the row with `row_id`.
    pub fn edit_row(&self, row_id: &RowId) -> Result<u64, Error> {
        match self.dataset.find(row_id) {
            Some(row) => self.start_editing(&row),
            None => {
                log::warn!("Cannot edit row {}: not found", row_id);
                Err(Error::misuse(format!("row {} not found", row_id)))
            }
        }
    }

    /// Row click: starts editing when the mode edits on click.
    pub fn handle_row_click(&self, row: &Row) -> Option<u64> {
        if !self.policy.edit_on_row_click {
            return None;
        }
        if self.is_editing(row.id()) {
            return Some(self.render_session());
        }
        self.start_editing(row).ok()
    }

    /// Writes a field change to the working copy and [`EditedRows`].
    pub fn update_field(&self, field: &str, value: Value) -> Result<(), Error> {
        let row_id = {
            let mut session = write_lock(&self.session);
            let Some(session) = session.as_mut() else {
                log::warn!("Ignoring change of {}: no row is being edited", field);
                return Err(Error::misuse("no row is being edited"));
            };
            session.working.insert(field.to_string(), value.clone());
            session.target.row_id()
        };
        self.edits.update_cell(&row_id, field, value);
        write_lock(&self.validation).clear_field(&row_id, field);
        Ok(())
    }

    /// Saves the open session.
    ///
    /// Existing rows without changes are not sent anywhere. Invalid rows
    /// keep the session open and request focus on the first invalid field.
    pub async fn save_editing(&self) -> Result<SaveOutcome, Error> {
        let Some(session) = self.session() else {
            log::warn!("Save requested but no row is being edited");
            return Err(Error::misuse("no row is being edited"));
        };
        let row_id = session.target.row_id();
        let columns = read_lock(&self.columns).clone();

        if matches!(session.target, EditTarget::Existing(_)) && !is_dirty(&columns, &session.original, &session.working) {
            log::debug!("Row {} unchanged, nothing to save", row_id);
            self.events.on_toast(Toast::info(&self.messages.nochangesmessage));
            self.finish_session(&session.target);
            return Ok(SaveOutcome::NoChanges);
        }

        if let Err(err) = self.validate(&row_id, &columns, &session.working) {
            log::debug!("{}", err);
            write_lock(&self.validation).record(&err);
            if let Some(field) = err.first_field() {
                self.events.on_focus_field(&row_id, field);
            }
            return Err(err.into());
        }

        match &session.target {
            EditTarget::Existing(id) => self.save_existing(id, &session).await,
            EditTarget::NewRow => self.save_new(&session).await,
        }
    }

    /// Saves the new-row form.
    pub async fn save_new_row(&self) -> Result<SaveOutcome, Error> {
        if !self.is_adding_new_row() {
            log::warn!("Save new row requested but the new-row form is not open");
            return Err(Error::misuse("new-row form is not open"));
        }
        self.save_editing().await
    }

    /// Discards the open session. The dataset is untouched.
    ///
    /// Returns `false` if nothing was being edited.
    pub fn cancel_editing(&self) -> bool {
        let Some(session) = write_lock(&self.session).take() else {
            return false;
        };
        self.clear_row_state(&session.target.row_id());
        if session.target == EditTarget::NewRow && self.policy.show_new_row_by_default {
            let _ = self.handle_add_new_row_click();
        }
        true
    }

    /// Opens the new-row form seeded with column default values.
    ///
    /// Only inline and quick-edit tables add rows; other modes log a
    /// warning and skip.
    pub fn handle_add_new_row_click(&self) -> Result<u64, Error> {
        if !self.policy.allows_new_row {
            log::warn!("Adding rows is not supported in {:?} edit mode", self.mode);
            return Err(Error::misuse("edit mode does not support adding rows"));
        }
        let row_id = RowId::new_row();
        let defaults: Map<String, Value> = read_lock(&self.columns)
            .iter()
            .filter(|c| c.is_data_column())
            .filter_map(|c| c.defaultvalue.clone().map(|v| (c.binding.clone(), v)))
            .collect();

        let pending = self.edits.get_edits(&row_id).unwrap_or_default();
        for (field, value) in &defaults {
            if !pending.contains_key(field) {
                self.edits.update_cell(&row_id, field, value.clone());
            }
        }
        let mut working = defaults;
        working.extend(pending);
        write_lock(&self.validation).clear_row(&row_id);

        let render_session = self.render_session.fetch_add(1, Ordering::SeqCst) + 1;
        *write_lock(&self.session) = Some(EditSession {
            target: EditTarget::NewRow,
            original: Map::new(),
            working,
            render_session,
        });
        Ok(render_session)
    }

    /// Deletes a row, optimistically.
    pub async fn delete_row(&self, row_id: &RowId) -> Result<(), Error> {
        let Some(row) = self.dataset.find(row_id) else {
            log::warn!("Cannot delete row {}: not found", row_id);
            return Err(Error::misuse(format!("row {} not found", row_id)));
        };
        let snapshot = self.dataset.snapshot();
        self.dataset.update(|rows| rows.retain(|r| r.id() != row_id));

        if let Some(datasource) = self.crud_datasource() {
            if let Err(err) = datasource.delete_record(row.fields().clone()).await {
                self.dataset.restore(snapshot);
                return Err(self.report_failure(TableOperation::Delete, err));
            }
        }

        if self.is_editing(row_id) {
            *write_lock(&self.session) = None;
        }
        self.clear_row_state(row_id);
        log::info!("Row {} deleted", row_id);
        self.events.on_toast(Toast::success(&self.messages.deletemessage));
        Ok(())
    }

    /// Enter (without Shift) saves and Escape cancels the session keyed by
    /// `source`, the row id or `"new-row"`.
    pub async fn handle_key(&self, key: EditKey, source: &RowId) -> KeyOutcome {
        if !self.policy.keyboard || !self.is_editing(source) {
            return KeyOutcome::Ignored;
        }
        match key {
            EditKey::Enter { shift: false } => match self.save_editing().await {
                Ok(outcome) => KeyOutcome::Saved(outcome),
                Err(_) => KeyOutcome::SaveFailed,
            },
            EditKey::Escape => {
                self.cancel_editing();
                KeyOutcome::Cancelled
            }
            EditKey::Enter { shift: true } | EditKey::Other => KeyOutcome::Ignored,
        }
    }

    async fn save_existing(&self, row_id: &RowId, session: &EditSession) -> Result<SaveOutcome, Error> {
        let mut record = session.original.clone();
        record.extend(session.working.clone());

        let snapshot = self.dataset.snapshot();
        set_row_fields(&self.dataset, row_id, record.clone());

        let stored = match self.crud_datasource() {
            Some(datasource) => match datasource.update_record(record).await {
                Ok(stored) => {
                    if let Value::Object(fields) = &stored {
                        set_row_fields(&self.dataset, row_id, fields.clone());
                    }
                    stored
                }
                Err(err) => {
                    self.dataset.restore(snapshot);
                    return Err(self.report_failure(TableOperation::Update, err));
                }
            },
            None => Value::Object(record),
        };

        log::info!("Row {} updated", row_id);
        self.events.on_row_saved(row_id, &stored);
        self.events.on_toast(Toast::success(&self.messages.updatemessage));
        self.finish_session(&session.target);
        Ok(SaveOutcome::Updated(row_id.clone()))
    }

    async fn save_new(&self, session: &EditSession) -> Result<SaveOutcome, Error> {
        let record = session.working.clone();
        let snapshot = self.dataset.snapshot();
        let index = snapshot.len();
        let provisional = unique_row(Value::Object(record.clone()), index, &snapshot);
        let provisional_id = provisional.id().clone();
        self.dataset.update(|rows| rows.push(provisional));

        let (row_id, stored) = match self.crud_datasource() {
            Some(datasource) => match datasource.insert_record(record).await {
                Ok(stored) => {
                    let row = unique_row(stored.clone(), index, &snapshot);
                    let id = row.id().clone();
                    self.dataset.update(|rows| {
                        if let Some(slot) = rows.iter_mut().find(|r| r.id() == &provisional_id) {
                            *slot = row;
                        }
                    });
                    (id, stored)
                }
                Err(err) => {
                    self.dataset.restore(snapshot);
                    return Err(self.report_failure(TableOperation::Insert, err));
                }
            },
            None => (provisional_id, Value::Object(record)),
        };

        let page = self.page_of(&row_id);
        log::info!("Row {} inserted on page {}", row_id, page);
        self.events.on_row_saved(&row_id, &stored);
        self.events.on_toast(Toast::success(&self.messages.insertmessage));
        self.finish_session(&session.target);
        if self.policy.show_new_row_by_default {
            let _ = self.handle_add_new_row_click();
        }
        Ok(SaveOutcome::Inserted { row_id, page })
    }

    fn validate(&self, row_id: &RowId, columns: &[Column], values: &Map<String, Value>) -> Result<(), ValidationError> {
        let mut issues = match validate_row(row_id, columns, values) {
            Ok(()) => Vec::new(),
            Err(err) => err.issues,
        };
        for marker in read_lock(&self.validation).marker_issues(row_id, columns) {
            if !issues.iter().any(|issue| issue.field == marker.field) {
                issues.push(marker);
            }
        }
        if issues.is_empty() {
            return Ok(());
        }
        issues.sort_by_key(|issue| {
            columns
                .iter()
                .position(|c| c.binding == issue.field)
                .unwrap_or(usize::MAX)
        });
        Err(ValidationError {
            row_id: row_id.clone(),
            issues,
        })
    }

    /// 1-based page holding `row_id`: its sorted position when sorting is
    /// active, else the last page.
    fn page_of(&self, row_id: &RowId) -> usize {
        let size = self.page_size.load(Ordering::SeqCst).max(1);
        let mut rows = self.dataset.snapshot().to_vec();
        let sorting = read_lock(&self.sorting).clone();
        if !sorting.is_empty() {
            sort_rows(&mut rows, &sorting);
            if let Some(position) = rows.iter().position(|r| r.id() == row_id) {
                return position / size + 1;
            }
        }
        rows.len().div_ceil(size).max(1)
    }

    fn crud_datasource(&self) -> Option<Arc<dyn Datasource>> {
        read_lock(&self.datasource)
            .clone()
            .filter(|ds| ds.supports_crud())
    }

    fn finish_session(&self, target: &EditTarget) {
        {
            let mut session = write_lock(&self.session);
            if session.as_ref().is_some_and(|s| &s.target == target) {
                *session = None;
            }
        }
        self.clear_row_state(&target.row_id());
    }

    fn clear_row_state(&self, row_id: &RowId) {
        self.edits.remove_row_edits(row_id);
        write_lock(&self.validation).clear_row(row_id);
    }

    fn report_failure(&self, operation: TableOperation, err: DatasourceError) -> Error {
        log::error!("Failed to {} row: {}", operation, err);
        let err = Error::from(err);
        self.events.on_toast(Toast::error(&self.messages.errormessage));
        self.events.on_error(operation, &err);
        err
    }
}

/// Compares the stringified value of each data column.
fn is_dirty(columns: &[Column], original: &Map<String, Value>, working: &Map<String, Value>) -> bool {
    let text = |map: &Map<String, Value>, field: &str| map.get(field).map(display_string).unwrap_or_default();
    let data_columns: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_data_column())
        .map(|c| c.binding.as_str())
        .collect();
    if data_columns.is_empty() {
        return working
            .keys()
            .any(|field| text(original, field) != text(working, field));
    }
    data_columns
        .into_iter()
        .any(|field| text(original, field) != text(working, field))
}

fn set_row_fields(dataset: &Dataset, row_id: &RowId, fields: Map<String, Value>) {
    dataset.update(|rows| {
        if let Some(row) = rows.iter_mut().find(|r| r.id() == row_id) {
            *row = Row::new(row_id.clone(), fields);
        }
    });
}

/// Tags `value`, suffixing the index when the id is already taken.
fn unique_row(value: Value, index: usize, existing: &[Row]) -> Row {
    let row = Row::tagged(value, index);
    if existing.iter().any(|r| r.id() == row.id()) {
        let id = RowId::new(format!("{}-{}", row.id(), index));
        return Row::new(id, row.into_fields());
    }
    row
}
