//! Filter types

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::Row;
use crate::model::display_string;

/// String matching policy for filter and search comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The value contains the query anywhere.
    #[default]
    #[serde(alias = "anywhere")]
    Contains,
    /// The value starts with the query.
    Start,
    /// The value ends with the query.
    End,
    /// The value equals the query.
    Exact,
}

impl MatchMode {
    /// Tests `value` against `query`.
    ///
    /// Case-insensitive unless `case_sensitive` is set.
    ///
    /// # Example
    ///
    /// ```
    /// use tablekit_lib::query::MatchMode;
    ///
    /// assert!(MatchMode::Start.matches("Grape", "gr", false));
    /// assert!(!MatchMode::Start.matches("Banana", "a", false));
    /// ```
    pub fn matches(self, value: &str, query: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            self.test(value, query)
        } else {
            self.test(&value.to_lowercase(), &query.to_lowercase())
        }
    }

    fn test(self, value: &str, query: &str) -> bool {
        match self {
            Self::Contains => value.contains(query),
            Self::Start => value.starts_with(query),
            Self::End => value.ends_with(query),
            Self::Exact => value == query,
        }
    }
}

/// How multiple filter fields combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    /// Every filter must match.
    #[default]
    And,
    /// Any filter may match.
    Or,
}

/// One column filter.
///
/// This is both the persisted `search` entry and what datasources receive as
/// `filterFields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Field filtered on.
    pub field: String,
    /// Query value.
    pub value: Value,
    /// Matching policy.
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Column data type hint, passed through to datasources.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl FilterSpec {
    /// Creates a `contains` filter.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            match_mode: MatchMode::Contains,
            data_type: None,
        }
    }

    /// Sets the match mode.
    pub fn match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Returns `true` for filters with an empty query, which match everything.
    pub fn is_blank(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Tests a row (case-insensitive). Blank filters match every row.
    pub fn matches(&self, row: &Row) -> bool {
        if self.is_blank() {
            return true;
        }
        let query = display_string(&self.value);
        self.match_mode
            .matches(&row.display_value(&self.field), &query, false)
    }
}

/// Tests a row against all filters combined with `op`.
pub fn row_matches(row: &Row, filters: &[FilterSpec], op: LogicalOp) -> bool {
    let mut active = filters.iter().filter(|f| !f.is_blank()).peekable();
    if active.peek().is_none() {
        return true;
    }
    match op {
        LogicalOp::And => active.all(|f| f.matches(row)),
        LogicalOp::Or => active.any(|f| f.matches(row)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::add_unique_row_ids;

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Contains.matches("Banana", "NAN", false));
        assert!(!MatchMode::Contains.matches("Banana", "NAN", true));
        assert!(MatchMode::End.matches("Grape", "pe", false));
        assert!(MatchMode::Exact.matches("Grape", "grape", false));
        assert!(!MatchMode::Exact.matches("Grape", "grap", false));
    }

    #[test]
    fn test_row_matches_combines_filters() {
        let row = add_unique_row_ids(vec![json!({"name": "Ada", "city": "Paris"})]).remove(0);
        let filters = vec![
            FilterSpec::new("name", "ad").match_mode(MatchMode::Start),
            FilterSpec::new("city", "rome"),
        ];
        assert!(!row_matches(&row, &filters, LogicalOp::And));
        assert!(row_matches(&row, &filters, LogicalOp::Or));
        assert!(row_matches(&row, &[FilterSpec::new("city", "")], LogicalOp::And));
    }

    #[test]
    fn test_filter_spec_wire_format() {
        let spec: FilterSpec =
            serde_json::from_value(json!({"field": "name", "value": "a", "matchMode": "start"})).unwrap();
        assert_eq!(spec.match_mode, MatchMode::Start);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"field": "name", "value": "a", "matchMode": "start"})
        );
    }
}
