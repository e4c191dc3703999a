//! Validation error types

use crate::model::RowId;

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// A required field is empty.
    Required,
    /// The value does not match the configured pattern.
    Pattern,
    /// The value is shorter than the minimum length.
    TooShort,
    /// The value is longer than the maximum length.
    TooLong,
    /// The value is below the minimum.
    RangeUnderflow,
    /// The value is above the maximum.
    RangeOverflow,
    /// The value is not of the expected input type (number, email, url).
    TypeMismatch,
    /// The hosting field widget flagged itself invalid.
    Marked,
}

/// Error information for a specific field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// The field that failed validation.
    pub field: String,
    /// What kind of constraint was violated.
    pub kind: IssueKind,
    /// Human-readable validation error message.
    pub message: String,
}

impl FieldIssue {
    /// Creates a new field issue.
    pub fn new(field: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A row failed validation. Carries every issue, in column order.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Row {row_id} has {} invalid field(s)", issues.len())]
pub struct ValidationError {
    /// The row being edited.
    pub row_id: RowId,
    /// The issues, first invalid column first.
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Returns the first invalid field, which receives focus.
    pub fn first_field(&self) -> Option<&str> {
        self.issues.first().map(|issue| issue.field.as_str())
    }
}
