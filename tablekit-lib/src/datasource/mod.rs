//! The external datasource contract.
//!
//! A datasource abstracts a remote service or a local variable that a table
//! or search widget is bound to. It may page, sort and filter server-side
//! (see [`Operation::IsPageable`]), and it may accept CRUD operations.
//!
//! [`MemoryDatasource`] is an in-process implementation used by hosts that
//! bind to plain arrays and by tests.

mod memory;

pub use memory::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::DatasourceError;
use crate::export::ExportRequest;
use crate::query::FilterSpec;
use crate::query::LogicalOp;

/// Options passed to [`Datasource::invoke`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeOptions {
    /// 1-based page to fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Order clause, e.g. `"name asc, age desc"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Column filters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_fields: Vec<FilterSpec>,
    /// How filters combine.
    pub condition: LogicalOp,
}

impl InvokeOptions {
    /// Creates options for fetching `page`.
    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Sets the page size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the order clause. Empty clauses are dropped.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        let order_by = order_by.into();
        self.order_by = (!order_by.is_empty()).then_some(order_by);
        self
    }

    /// Sets the filter fields.
    pub fn with_filters(mut self, filters: Vec<FilterSpec>) -> Self {
        self.filter_fields = filters;
        self
    }

    /// Sets the filter combination.
    pub fn with_condition(mut self, condition: LogicalOp) -> Self {
        self.condition = condition;
        self
    }
}

/// Server paging metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Page size used by the server.
    pub size: usize,
    /// Total matching records.
    pub total_elements: usize,
    /// Total pages.
    pub total_pages: usize,
    /// 0-based number of the returned page.
    #[serde(default)]
    pub number: usize,
    /// Whether the returned page is the first.
    pub first: bool,
    /// Whether the returned page is the last.
    pub last: bool,
}

impl PageMeta {
    /// Computes metadata for `page` (1-based) of a result of `total` records.
    pub fn compute(page: usize, size: usize, total: usize) -> Self {
        let total_pages = if size == 0 { 1 } else { total.div_ceil(size).max(1) };
        let page = page.clamp(1, total_pages);
        Self {
            size,
            total_elements: total,
            total_pages,
            number: page - 1,
            first: page == 1,
            last: page >= total_pages,
        }
    }
}

/// Result of [`Datasource::invoke`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasourceResponse {
    /// Returned records, untagged.
    pub data: Vec<Value>,
    /// Paging metadata, when the datasource pages.
    pub pagination: Option<PageMeta>,
}

impl DatasourceResponse {
    /// Parses a raw `{data, pagination}` response body.
    ///
    /// A bare array is accepted as `data`. Any other shape is a
    /// [`DatasourceError::Parse`].
    pub fn from_value(value: Value) -> Result<Self, DatasourceError> {
        match value {
            Value::Array(data) => Ok(Self {
                data,
                pagination: None,
            }),
            Value::Object(mut body) => {
                let data = match body.remove("data") {
                    Some(Value::Array(data)) => data,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(DatasourceError::parse_with_body(
                            "`data` is not an array",
                            other.to_string(),
                        ));
                    }
                };
                let pagination = match body.remove("pagination") {
                    Some(Value::Null) | None => None,
                    Some(meta) => Some(serde_json::from_value(meta).map_err(|e| {
                        DatasourceError::parse(format!("invalid pagination: {}", e))
                    })?),
                };
                Ok(Self { data, pagination })
            }
            Value::Null => Ok(Self::default()),
            other => Err(DatasourceError::parse_with_body(
                "unexpected response shape",
                other.to_string(),
            )),
        }
    }
}

/// Operations passed to [`Datasource::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Asks whether the datasource pages server-side. Answers `Value::Bool`.
    IsPageable,
    /// Requests an export file.
    Download(ExportRequest),
}

impl Operation {
    /// Returns the operation name as the runtime spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsPageable => "IS_PAGEABLE",
            Self::Download(_) => "DOWNLOAD",
        }
    }
}

/// A remote or local source of records.
///
/// Only [`invoke`](Self::invoke) and [`execute`](Self::execute) are required.
/// The CRUD methods default to [`DatasourceError::Unsupported`].
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Fetches records.
    async fn invoke(&self, options: InvokeOptions) -> Result<DatasourceResponse, DatasourceError>;

    /// Runs a non-fetch operation.
    async fn execute(&self, operation: Operation) -> Result<Value, DatasourceError>;

    /// Returns whether the datasource pages server-side.
    async fn is_pageable(&self) -> bool {
        matches!(self.execute(Operation::IsPageable).await, Ok(Value::Bool(true)))
    }

    /// Paging metadata of the last response, if any.
    fn pagination(&self) -> Option<PageMeta> {
        None
    }

    /// Returns `true` if the datasource accepts a page-size hint.
    fn supports_max_results(&self) -> bool {
        false
    }

    /// Sets the page-size hint.
    fn set_max_results(&self, _size: usize) {}

    /// Returns `true` while a request is in flight.
    fn is_loading(&self) -> bool {
        false
    }

    /// Returns `true` if the CRUD methods are implemented.
    fn supports_crud(&self) -> bool {
        false
    }

    /// Inserts a record and returns it as stored.
    async fn insert_record(&self, _record: Map<String, Value>) -> Result<Value, DatasourceError> {
        Err(DatasourceError::unsupported("insert"))
    }

    /// Updates a record and returns it as stored.
    async fn update_record(&self, _record: Map<String, Value>) -> Result<Value, DatasourceError> {
        Err(DatasourceError::unsupported("update"))
    }

    /// Deletes a record.
    async fn delete_record(&self, _record: Map<String, Value>) -> Result<(), DatasourceError> {
        Err(DatasourceError::unsupported("delete"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_page_meta_compute() {
        let meta = PageMeta::compute(3, 5, 12);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.last);
        assert!(!meta.first);

        let empty = PageMeta::compute(1, 5, 0);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.first && empty.last);
    }

    #[test]
    fn test_response_shapes() {
        let response = DatasourceResponse::from_value(json!({
            "data": [{"a": 1}],
            "pagination": {"size": 5, "totalElements": 1, "totalPages": 1, "first": true, "last": true}
        }))
        .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.pagination.map(|p| p.total_elements), Some(1));

        assert!(DatasourceResponse::from_value(json!(null)).unwrap().data.is_empty());
        assert_eq!(DatasourceResponse::from_value(json!([1, 2])).unwrap().data.len(), 2);
        assert!(DatasourceResponse::from_value(json!("oops")).unwrap_err().is_parse());
    }
}
