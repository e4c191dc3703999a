//! Save-time validation of edited rows

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use crate::error::FieldIssue;
use crate::error::IssueKind;
use crate::error::ValidationError;
use crate::model::Column;
use crate::model::InputType;
use crate::model::RowId;
use crate::model::as_number;
use crate::model::display_string;

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").ok());

/// Validates one field value against its column.
///
/// Empty values only fail `required`; the other constraints apply to
/// non-empty values.
pub fn validate_field(column: &Column, value: Option<&Value>) -> Option<FieldIssue> {
    let text = value.map(display_string).unwrap_or_default();
    let field = column.binding.as_str();

    if text.trim().is_empty() {
        return column
            .required
            .then(|| FieldIssue::new(field, IssueKind::Required, format!("{} is required", column.caption)));
    }

    let constraints = &column.constraints;
    let length = text.chars().count();
    if let Some(min) = constraints.minlength.filter(|min| length < *min) {
        return Some(FieldIssue::new(
            field,
            IssueKind::TooShort,
            format!("Use at least {} characters", min),
        ));
    }
    if let Some(max) = constraints.maxlength.filter(|max| length > *max) {
        return Some(FieldIssue::new(
            field,
            IssueKind::TooLong,
            format!("Use at most {} characters", max),
        ));
    }

    if let Some(pattern) = &constraints.regexp {
        match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(re) if !re.is_match(&text) => {
                return Some(FieldIssue::new(field, IssueKind::Pattern, "Value does not match the required format"));
            }
            Ok(_) => {}
            Err(err) => log::warn!("Ignoring invalid pattern on column {}: {}", field, err),
        }
    }

    let numeric = column.data_type.is_numeric() || constraints.inputtype == InputType::Number;
    let has_range = constraints.minvalue.is_some() || constraints.maxvalue.is_some();
    if numeric || has_range {
        let Some(number) = value.and_then(as_number) else {
            return Some(FieldIssue::new(field, IssueKind::TypeMismatch, "Enter a number"));
        };
        if let Some(min) = constraints.minvalue.filter(|min| number < *min) {
            return Some(FieldIssue::new(
                field,
                IssueKind::RangeUnderflow,
                format!("Value must be at least {}", min),
            ));
        }
        if let Some(max) = constraints.maxvalue.filter(|max| number > *max) {
            return Some(FieldIssue::new(
                field,
                IssueKind::RangeOverflow,
                format!("Value must be at most {}", max),
            ));
        }
    }

    match constraints.inputtype {
        InputType::Email if !email_address::EmailAddress::is_valid(&text) => {
            Some(FieldIssue::new(field, IssueKind::TypeMismatch, "Enter a valid email address"))
        }
        InputType::Url if !URL_PATTERN.as_ref().is_some_and(|re| re.is_match(&text)) => {
            Some(FieldIssue::new(field, IssueKind::TypeMismatch, "Enter a valid URL"))
        }
        _ => None,
    }
}

/// Validates the editable fields of one row, in column order.
pub fn validate_row(row_id: &RowId, columns: &[Column], values: &Map<String, Value>) -> Result<(), ValidationError> {
    let issues: Vec<FieldIssue> = columns
        .iter()
        .filter(|column| column.is_editable())
        .filter_map(|column| validate_field(column, values.get(&column.binding)))
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            row_id: row_id.clone(),
            issues,
        })
    }
}

/// Per-row, per-field validation state.
///
/// Holds both the issues found at save time and invalid markers set by the
/// field widgets themselves.
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    issues: HashMap<RowId, HashMap<String, FieldIssue>>,
    markers: HashMap<RowId, HashMap<String, String>>,
}

impl ValidationState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the issues of a failed validation, replacing older ones.
    pub fn record(&mut self, error: &ValidationError) {
        let row = self.issues.entry(error.row_id.clone()).or_default();
        row.clear();
        for issue in &error.issues {
            row.insert(issue.field.clone(), issue.clone());
        }
    }

    /// Marks a field invalid on behalf of its widget.
    pub fn mark_invalid(&mut self, row_id: &RowId, field: &str, message: impl Into<String>) {
        self.markers
            .entry(row_id.clone())
            .or_default()
            .insert(field.to_string(), message.into());
    }

    /// Removes a widget marker.
    pub fn clear_marker(&mut self, row_id: &RowId, field: &str) {
        if let Some(row) = self.markers.get_mut(row_id) {
            row.remove(field);
        }
    }

    /// Returns the marker issues of a row, ordered by `columns`.
    pub fn marker_issues(&self, row_id: &RowId, columns: &[Column]) -> Vec<FieldIssue> {
        let Some(markers) = self.markers.get(row_id) else {
            return Vec::new();
        };
        columns
            .iter()
            .filter_map(|column| {
                markers
                    .get(&column.binding)
                    .map(|message| FieldIssue::new(&column.binding, IssueKind::Marked, message))
            })
            .collect()
    }

    /// Returns the issue recorded for a field.
    pub fn issue(&self, row_id: &RowId, field: &str) -> Option<&FieldIssue> {
        self.issues.get(row_id)?.get(field)
    }

    /// Returns every issue recorded for a row.
    pub fn row_issues(&self, row_id: &RowId) -> HashMap<String, FieldIssue> {
        self.issues.get(row_id).cloned().unwrap_or_default()
    }

    /// Returns `true` if the field has an issue or a marker.
    pub fn is_invalid(&self, row_id: &RowId, field: &str) -> bool {
        self.issue(row_id, field).is_some()
            || self
                .markers
                .get(row_id)
                .is_some_and(|row| row.contains_key(field))
    }

    /// Clears the recorded issue of one field.
    pub fn clear_field(&mut self, row_id: &RowId, field: &str) {
        if let Some(row) = self.issues.get_mut(row_id) {
            row.remove(field);
        }
    }

    /// Clears everything recorded for a row.
    pub fn clear_row(&mut self, row_id: &RowId) {
        self.issues.remove(row_id);
        self.markers.remove(row_id);
    }
}
