//! Callbacks from the table engine to its host.
//!
//! The engine never throws at the host. Everything observable (toasts,
//! page changes, errors, focus requests) goes through a [`TableEvents`]
//! implementation.

use serde_json::Value;

use crate::error::Error;
use crate::model::Row;
use crate::model::RowId;

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Neutral information.
    Info,
    /// An operation succeeded.
    Success,
    /// Something needs attention.
    Warning,
    /// An operation failed.
    Error,
}

/// A toast notification for the user.
///
/// # Example
///
/// ```
/// use tablekit_lib::events::{Toast, ToastLevel};
///
/// let toast = Toast::success("Record added successfully");
/// assert_eq!(toast.level, ToastLevel::Success);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Message text.
    pub message: String,
}

impl Toast {
    /// Create an info toast.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    /// Create a success toast.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    /// Create a warning toast.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Warning,
            message: message.into(),
        }
    }

    /// Create an error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Operation reported to [`TableEvents::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOperation {
    /// Fetching a page or the next chunk.
    Fetch,
    /// Server-side sorting.
    Sort,
    /// Server-side filtering.
    Filter,
    /// Inserting a record.
    Insert,
    /// Updating a record.
    Update,
    /// Deleting a record.
    Delete,
    /// Exporting data.
    Export,
    /// Reading or writing persisted state.
    Persist,
}

impl std::fmt::Display for TableOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Sort => "sort",
            Self::Filter => "filter",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// The page a paginator settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChange {
    /// 1-based page number.
    pub page: usize,
    /// Page size.
    pub page_size: usize,
    /// Rows of the page (client: a slice, server: the response).
    pub rows: Vec<Row>,
}

/// Host callbacks. Every method defaults to doing nothing.
pub trait TableEvents: Send + Sync {
    /// Show a toast.
    fn on_toast(&self, _toast: Toast) {}

    /// A datasource or storage operation failed.
    fn on_error(&self, _operation: TableOperation, _error: &Error) {}

    /// The visible page changed (or was refreshed).
    fn on_pagination_change(&self, _change: &PageChange) {}

    /// The records bound to the table changed.
    fn on_set_record(&self, _change: &PageChange) {}

    /// Focus should move to a field of a row (first invalid field on save).
    fn on_focus_field(&self, _row_id: &RowId, _field: &str) {}

    /// A row finished saving; `value` is the record as stored.
    fn on_row_saved(&self, _row_id: &RowId, _value: &Value) {}
}

/// Events sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl TableEvents for NoopEvents {}
