//! Runtime column overrides and the summary row
//!
//! Host scripts change column display properties by index; every change
//! bumps a version that renderers compare against to decide whether to
//! re-read the columns.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use futures::future::BoxFuture;
use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::model::AggregateCache;
use crate::model::Column;
use crate::model::Dataset;
use crate::util::lock;
use crate::util::read_lock;
use crate::util::write_lock;

/// Columns with their overrides applied, at a version.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSnapshot {
    /// Version the snapshot was taken at.
    pub version: u64,
    /// Columns in display order.
    pub columns: Vec<Column>,
}

/// Input of [`ColumnOverrides::set_summary_row_data`].
pub enum SummaryInput {
    /// One summary row, `{field: value}`.
    Value(Value),
    /// Several summary rows.
    Rows(Vec<Value>),
    /// Resolves to either of the above.
    Future(BoxFuture<'static, Value>),
}

impl std::fmt::Debug for SummaryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            Self::Future(_) => f.write_str("Future(..)"),
        }
    }
}

/// One cell of the summary row.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryCell {
    /// The summary is still resolving.
    Loading,
    /// The value to show; `Null` for columns without one.
    Ready(Value),
}

#[derive(Debug, Clone, Default)]
enum SummaryState {
    #[default]
    Empty,
    Loading,
    Ready(Vec<Map<String, Value>>),
}

/// Column definitions plus runtime overrides keyed by column index.
#[derive(Debug, Default)]
pub struct ColumnOverrides {
    base: RwLock<Vec<Column>>,
    overrides: RwLock<BTreeMap<usize, Map<String, Value>>>,
    version: AtomicU64,
    summary: RwLock<SummaryState>,
    summary_generation: AtomicU64,
    aggregates: Mutex<AggregateCache>,
}

impl ColumnOverrides {
    /// Creates the store over the widget's column definitions.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            base: RwLock::new(columns),
            ..Self::default()
        }
    }

    /// Returns the current version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Replaces the base definitions, keeping overrides.
    pub fn set_columns(&self, columns: Vec<Column>) {
        *write_lock(&self.base) = columns;
        self.bump();
    }

    /// Returns the columns with overrides applied.
    pub fn columns(&self) -> Vec<Column> {
        let overrides = read_lock(&self.overrides);
        read_lock(&self.base)
            .iter()
            .enumerate()
            .map(|(index, column)| match overrides.get(&index) {
                Some(patch) => apply_patch(column, patch).unwrap_or_else(|| column.clone()),
                None => column.clone(),
            })
            .collect()
    }

    /// Sets one property of the column at `index`.
    ///
    /// The property name is the column's wire name (`caption`, `show`,
    /// `width`, ...). Returns the version after the change; setting the
    /// current value leaves the version alone.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use tablekit_lib::columns::ColumnOverrides;
    /// use tablekit_lib::model::Column;
    ///
    /// let columns = ColumnOverrides::new(vec![Column::new("name", "Name")]);
    /// let version = columns.set_column_property(0, "caption", json!("Full name")).unwrap();
    /// assert_eq!(version, 1);
    /// assert_eq!(columns.columns()[0].caption, "Full name");
    /// assert!(columns.get_column_snapshot(version).is_none());
    /// ```
    pub fn set_column_property(&self, index: usize, key: &str, value: Value) -> Result<u64, Error> {
        let Some(column) = self.columns().get(index).cloned() else {
            log::warn!("Cannot set `{}` on column {}: no such column", key, index);
            return Err(Error::misuse(format!("no column at index {}", index)));
        };

        let mut patch = Map::new();
        patch.insert(key.to_string(), value.clone());
        let Some(updated) = apply_patch(&column, &patch) else {
            log::warn!("Cannot set `{}` on column {}: invalid value {}", key, index, value);
            return Err(Error::misuse(format!("invalid value for column property `{}`", key)));
        };
        if updated == column {
            return Ok(self.version());
        }

        write_lock(&self.overrides)
            .entry(index)
            .or_default()
            .insert(key.to_string(), value);
        Ok(self.bump())
    }

    /// Returns the columns if the version moved past `since_version`.
    pub fn get_column_snapshot(&self, since_version: u64) -> Option<ColumnSnapshot> {
        let version = self.version();
        (version != since_version).then(|| ColumnSnapshot {
            version,
            columns: self.columns(),
        })
    }

    /// Sets the summary row data.
    ///
    /// A future shows [`SummaryCell::Loading`] until it resolves; its value
    /// is dropped if newer summary data was set meanwhile.
    pub async fn set_summary_row_data(&self, input: SummaryInput) {
        let generation = self.summary_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let value = match input {
            SummaryInput::Value(value) => value,
            SummaryInput::Rows(rows) => Value::Array(rows),
            SummaryInput::Future(future) => {
                *write_lock(&self.summary) = SummaryState::Loading;
                self.bump();
                let value = future.await;
                if self.summary_generation.load(Ordering::SeqCst) != generation {
                    log::debug!("Dropping superseded summary row data");
                    return;
                }
                value
            }
        };
        *write_lock(&self.summary) = SummaryState::Ready(summary_rows(value));
        self.bump();
    }

    /// Returns the number of summary rows; a loading summary counts as one.
    pub fn summary_row_count(&self) -> usize {
        match &*read_lock(&self.summary) {
            SummaryState::Empty => 0,
            SummaryState::Loading => 1,
            SummaryState::Ready(rows) => rows.len(),
        }
    }

    /// Returns a summary cell, `None` when there is no such summary row.
    pub fn summary_cell(&self, row: usize, field: &str) -> Option<SummaryCell> {
        match &*read_lock(&self.summary) {
            SummaryState::Empty => None,
            SummaryState::Loading => (row == 0).then_some(SummaryCell::Loading),
            SummaryState::Ready(rows) => rows
                .get(row)
                .map(|cells| SummaryCell::Ready(cells.get(field).cloned().unwrap_or(Value::Null))),
        }
    }

    /// Computes the aggregates of the columns that declare one, over the
    /// full dataset. Cached until the dataset changes.
    pub fn aggregate_row(&self, dataset: &Dataset) -> Map<String, Value> {
        let rows = dataset.snapshot();
        let mut cache = lock(&self.aggregates);
        self.columns()
            .iter()
            .filter_map(|column| {
                let function = column.aggregate?;
                let value = cache
                    .get(dataset.version(), &rows, &column.binding, function)
                    .map(Value::from)
                    .unwrap_or(Value::Null);
                Some((column.binding.clone(), value))
            })
            .collect()
    }

    fn bump(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Applies a property patch through the column's serde form.
fn apply_patch(column: &Column, patch: &Map<String, Value>) -> Option<Column> {
    let Ok(Value::Object(mut fields)) = serde_json::to_value(column) else {
        return None;
    };
    fields.extend(patch.clone());
    serde_json::from_value(Value::Object(fields)).ok()
}

fn summary_rows(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Object(row) => vec![row],
        Value::Array(rows) => rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            log::warn!("Ignoring summary row data {}: not an object", other);
            Vec::new()
        }
    }
}
