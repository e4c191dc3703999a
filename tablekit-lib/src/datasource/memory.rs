//! In-memory datasource

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use super::Datasource;
use super::DatasourceResponse;
use super::InvokeOptions;
use super::Operation;
use super::PageMeta;
use crate::error::DatasourceError;
use crate::export::ExportRequest;
use crate::model::Row;
use crate::model::add_unique_row_ids;
use crate::query::parse_order_by;
use crate::query::row_matches;
use crate::query::sort_rows;
use crate::util::lock;
use crate::util::read_lock;
use crate::util::write_lock;

/// Default page size of a pageable in-memory datasource.
const DEFAULT_MAX_RESULTS: usize = 20;

/// Operations that can be made to fail once, see [`MemoryDatasource::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    /// The next `invoke`.
    Invoke,
    /// The next `insert_record`.
    Insert,
    /// The next `update_record`.
    Update,
    /// The next `delete_record`.
    Delete,
    /// The next `DOWNLOAD`.
    Download,
}

/// A datasource over an in-process array of JSON records.
///
/// Filters, sorts and (when pageable) pages like a server would. Records are
/// keyed by `key_field` (default `"id"`) for updates and deletes.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::datasource::MemoryDatasource;
///
/// let ds = MemoryDatasource::pageable(vec![json!({"id": 1}), json!({"id": 2})])
///     .with_max_results(1);
/// assert_eq!(ds.records().len(), 2);
/// ```
#[derive(Debug)]
pub struct MemoryDatasource {
    records: RwLock<Vec<Value>>,
    key_field: String,
    pageable: bool,
    max_results: AtomicUsize,
    meta: RwLock<Option<PageMeta>>,
    forced_loading: AtomicBool,
    in_flight: AtomicUsize,
    failures: Mutex<HashSet<FailOn>>,
    calls: Mutex<Vec<InvokeOptions>>,
    exports: Mutex<Vec<ExportRequest>>,
    next_key: AtomicU64,
    latency: Option<Duration>,
}

impl MemoryDatasource {
    /// Creates a non-pageable datasource: every invoke returns all matches.
    pub fn new(records: Vec<Value>) -> Self {
        let next_key = records.len() as u64 + 1;
        Self {
            records: RwLock::new(records),
            key_field: "id".to_string(),
            pageable: false,
            max_results: AtomicUsize::new(DEFAULT_MAX_RESULTS),
            meta: RwLock::new(None),
            forced_loading: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            failures: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            exports: Mutex::new(Vec::new()),
            next_key: AtomicU64::new(next_key),
            latency: None,
        }
    }

    /// Creates a datasource that pages server-side.
    pub fn pageable(records: Vec<Value>) -> Self {
        Self {
            pageable: true,
            ..Self::new(records)
        }
    }

    /// Sets the page size used when a request carries none.
    pub fn with_max_results(self, size: usize) -> Self {
        self.max_results.store(size, Ordering::SeqCst);
        self
    }

    /// Sets the record key field.
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Delays every request, keeping it in flight meanwhile.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call of the given kind fail.
    pub fn fail_next(&self, on: FailOn) {
        lock(&self.failures).insert(on);
    }

    /// Forces [`Datasource::is_loading`] on or off.
    pub fn set_loading(&self, loading: bool) {
        self.forced_loading.store(loading, Ordering::SeqCst);
    }

    /// Returns a copy of the stored records.
    pub fn records(&self) -> Vec<Value> {
        read_lock(&self.records).clone()
    }

    /// Replaces the stored records.
    pub fn set_records(&self, records: Vec<Value>) {
        *write_lock(&self.records) = records;
    }

    /// Returns every invoke received so far.
    pub fn invocations(&self) -> Vec<InvokeOptions> {
        lock(&self.calls).clone()
    }

    /// Returns every export request received so far.
    pub fn exports(&self) -> Vec<ExportRequest> {
        lock(&self.exports).clone()
    }

    /// Returns the current page-size hint.
    pub fn max_results(&self) -> usize {
        self.max_results.load(Ordering::SeqCst)
    }

    fn take_failure(&self, on: FailOn) -> bool {
        lock(&self.failures).remove(&on)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn key_of<'a>(&self, record: &'a Map<String, Value>) -> Option<&'a Value> {
        record.get(&self.key_field).filter(|v| !v.is_null())
    }

    fn query(&self, options: &InvokeOptions) -> Vec<Row> {
        let records = read_lock(&self.records).clone();
        let mut rows: Vec<Row> = add_unique_row_ids(records)
            .into_iter()
            .filter(|row| row_matches(row, &options.filter_fields, options.condition))
            .collect();
        if let Some(order_by) = &options.order_by {
            sort_rows(&mut rows, &parse_order_by(order_by));
        }
        rows
    }
}

#[async_trait]
impl Datasource for MemoryDatasource {
    async fn invoke(&self, options: InvokeOptions) -> Result<DatasourceResponse, DatasourceError> {
        lock(&self.calls).push(options.clone());
        self.simulate_latency().await;
        if self.take_failure(FailOn::Invoke) {
            return Err(DatasourceError::request_with_status(500, "invoke failed"));
        }

        let rows = self.query(&options);
        if !self.pageable {
            return Ok(DatasourceResponse {
                data: rows.into_iter().map(|row| Value::Object(row.into_fields())).collect(),
                pagination: None,
            });
        }

        let size = options.size.unwrap_or_else(|| self.max_results());
        let meta = PageMeta::compute(options.page.unwrap_or(1), size, rows.len());
        let data = rows
            .into_iter()
            .skip(meta.number * size)
            .take(size)
            .map(|row| Value::Object(row.into_fields()))
            .collect();
        *write_lock(&self.meta) = Some(meta);

        Ok(DatasourceResponse {
            data,
            pagination: Some(meta),
        })
    }

    async fn execute(&self, operation: Operation) -> Result<Value, DatasourceError> {
        match operation {
            Operation::IsPageable => Ok(Value::Bool(self.pageable)),
            Operation::Download(request) => {
                self.simulate_latency().await;
                if self.take_failure(FailOn::Download) {
                    return Err(DatasourceError::request("export failed"));
                }
                let rows = self.query(&request.invoke_options()).len();
                let export_type = request.export_type.clone();
                lock(&self.exports).push(request);
                Ok(serde_json::json!({ "exportType": export_type, "rows": rows }))
            }
        }
    }

    fn pagination(&self) -> Option<PageMeta> {
        *read_lock(&self.meta)
    }

    fn supports_max_results(&self) -> bool {
        self.pageable
    }

    fn set_max_results(&self, size: usize) {
        self.max_results.store(size, Ordering::SeqCst);
    }

    fn is_loading(&self) -> bool {
        self.forced_loading.load(Ordering::SeqCst) || self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn supports_crud(&self) -> bool {
        true
    }

    async fn insert_record(&self, mut record: Map<String, Value>) -> Result<Value, DatasourceError> {
        self.simulate_latency().await;
        if self.take_failure(FailOn::Insert) {
            return Err(DatasourceError::request("insert failed"));
        }
        if self.key_of(&record).is_none() {
            let key = self.next_key.fetch_add(1, Ordering::SeqCst);
            record.insert(self.key_field.clone(), Value::from(key));
        }
        let stored = Value::Object(record);
        write_lock(&self.records).push(stored.clone());
        Ok(stored)
    }

    async fn update_record(&self, record: Map<String, Value>) -> Result<Value, DatasourceError> {
        self.simulate_latency().await;
        if self.take_failure(FailOn::Update) {
            return Err(DatasourceError::request("update failed"));
        }
        let key = self
            .key_of(&record)
            .cloned()
            .ok_or_else(|| DatasourceError::NotFound(format!("record without `{}`", self.key_field)))?;

        let mut records = write_lock(&self.records);
        let existing = records
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|r| r.get(&self.key_field) == Some(&key))
            .ok_or_else(|| DatasourceError::NotFound(key.to_string()))?;
        for (field, value) in record {
            existing.insert(field, value);
        }
        Ok(Value::Object(existing.clone()))
    }

    async fn delete_record(&self, record: Map<String, Value>) -> Result<(), DatasourceError> {
        self.simulate_latency().await;
        if self.take_failure(FailOn::Delete) {
            return Err(DatasourceError::request("delete failed"));
        }
        let key = self
            .key_of(&record)
            .cloned()
            .ok_or_else(|| DatasourceError::NotFound(format!("record without `{}`", self.key_field)))?;

        let mut records = write_lock(&self.records);
        let before = records.len();
        records.retain(|r| r.get(&self.key_field) != Some(&key));
        if records.len() == before {
            return Err(DatasourceError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::FilterSpec;
    use crate::query::MatchMode;

    fn people() -> Vec<Value> {
        (1..=12)
            .map(|i| json!({"id": i, "name": format!("person {:02}", i)}))
            .collect()
    }

    #[tokio::test]
    async fn test_pageable_invoke_pages_and_reports_meta() {
        let ds = MemoryDatasource::pageable(people()).with_max_results(5);
        let response = ds.invoke(InvokeOptions::page(3)).await.unwrap();
        assert_eq!(response.data.len(), 2);
        let meta = response.pagination.unwrap();
        assert_eq!(meta.total_pages, 3);
        assert!(meta.last);
        assert_eq!(ds.pagination(), Some(meta));
    }

    #[tokio::test]
    async fn test_invoke_filters_and_sorts() {
        let ds = MemoryDatasource::new(people());
        let response = ds
            .invoke(
                InvokeOptions::default()
                    .with_filters(vec![FilterSpec::new("name", "person 1").match_mode(MatchMode::Start)])
                    .with_order_by("id desc"),
            )
            .await
            .unwrap();
        let ids: Vec<_> = response.data.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(12), json!(11), json!(10)]);
    }

    #[tokio::test]
    async fn test_crud_and_failures() {
        let ds = MemoryDatasource::new(people());
        let inserted = ds.insert_record(Map::new()).await.unwrap();
        assert_eq!(inserted["id"], json!(13));

        let mut update = Map::new();
        update.insert("id".into(), json!(2));
        update.insert("name".into(), json!("renamed"));
        ds.update_record(update.clone()).await.unwrap();
        assert_eq!(ds.records()[1]["name"], json!("renamed"));

        ds.fail_next(FailOn::Delete);
        assert!(ds.delete_record(update.clone()).await.is_err());
        ds.delete_record(update.clone()).await.unwrap();
        assert!(matches!(
            ds.delete_record(update).await,
            Err(DatasourceError::NotFound(_))
        ));
    }
}
