//! Export requests sent to a datasource's download endpoint

use serde::Deserialize;
use serde::Serialize;

use crate::datasource::InvokeOptions;
use crate::model::Column;
use crate::query::FilterSpec;
use crate::query::LogicalOp;
use crate::query::MatchMode;
use crate::query::SortColumn;
use crate::query::order_by;

/// One exported column: a raw field or an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportField {
    /// Column header.
    pub header: String,
    /// Exported field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Exported expression, used instead of the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl From<&Column> for ExportField {
    fn from(column: &Column) -> Self {
        match &column.expression {
            Some(expression) => Self {
                header: column.caption.clone(),
                field: None,
                expression: Some(expression.clone()),
            },
            None => Self {
                header: column.caption.clone(),
                field: Some(column.binding.clone()),
                expression: None,
            },
        }
    }
}

/// Payload of [`Operation::Download`](crate::datasource::Operation::Download).
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::export::ExportRequest;
/// use tablekit_lib::model::Column;
/// use tablekit_lib::query::{FilterSpec, SortColumn};
///
/// let columns = [Column::new("name", "Name"), Column::new("", "Actions").row_operations()];
/// let request = ExportRequest::build(
///     &columns,
///     &[FilterSpec::new("name", "a")],
///     &[SortColumn::new("name", true)],
///     "CSV",
///     Some(100),
/// );
///
/// let payload = serde_json::to_value(&request).unwrap();
/// assert_eq!(payload["orderBy"], "name desc");
/// assert_eq!(payload["logicalOp"], "AND");
/// assert_eq!(payload["fields"], json!([{"header": "Name", "field": "name"}]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Match mode of the table filters.
    pub match_mode: MatchMode,
    /// Active filters.
    pub filter_fields: Vec<FilterSpec>,
    /// Order clause; empty when unsorted.
    pub order_by: String,
    /// File type, e.g. `"CSV"` or `"EXCEL"`.
    pub export_type: String,
    /// Always `AND`.
    pub logical_op: LogicalOp,
    /// Maximum rows exported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_size: Option<usize>,
    /// Exported columns, in order.
    pub fields: Vec<ExportField>,
}

impl ExportRequest {
    /// Builds a request from the visible data columns and the current query.
    pub fn build(
        columns: &[Column],
        filters: &[FilterSpec],
        sorting: &[SortColumn],
        export_type: impl Into<String>,
        export_size: Option<usize>,
    ) -> Self {
        let filter_fields: Vec<FilterSpec> = filters.iter().filter(|f| !f.is_blank()).cloned().collect();
        let match_mode = filter_fields
            .first()
            .map(|f| f.match_mode)
            .unwrap_or_default();
        let fields = columns
            .iter()
            .filter(|c| c.show && !c.rowoperations)
            .map(ExportField::from)
            .collect();

        Self {
            match_mode,
            filter_fields,
            order_by: order_by(sorting),
            export_type: export_type.into(),
            logical_op: LogicalOp::And,
            export_size,
            fields,
        }
    }

    /// The query this export runs, as invoke options.
    pub fn invoke_options(&self) -> InvokeOptions {
        let mut options = InvokeOptions::default()
            .with_order_by(self.order_by.clone())
            .with_filters(self.filter_fields.clone())
            .with_condition(self.logical_op);
        options.size = self.export_size;
        options
    }
}
