//! Ordering types

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::Row;
use crate::model::as_number;
use crate::model::display_string;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 0-9).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

impl SortDirection {
    /// Returns `"asc"` or `"desc"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// The persisted sort: one field and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Sorted field.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Creates an ascending sort.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Creates a descending sort.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One entry of the in-memory sorting state (ordered, most significant first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortColumn {
    /// Column id (the bound field).
    pub id: String,
    /// Descending when `true`.
    pub desc: bool,
}

impl SortColumn {
    /// Creates a sorting entry.
    pub fn new(id: impl Into<String>, desc: bool) -> Self {
        Self { id: id.into(), desc }
    }
}

impl From<&SortSpec> for SortColumn {
    fn from(spec: &SortSpec) -> Self {
        Self {
            id: spec.field.clone(),
            desc: spec.direction == SortDirection::Desc,
        }
    }
}

impl From<&SortColumn> for SortSpec {
    fn from(column: &SortColumn) -> Self {
        Self {
            field: column.id.clone(),
            direction: if column.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }
    }
}

/// Converts sorting state into a datasource `orderBy` clause.
///
/// # Example
///
/// ```
/// use tablekit_lib::query::{SortColumn, order_by};
///
/// let clause = order_by(&[SortColumn::new("name", false), SortColumn::new("age", true)]);
/// assert_eq!(clause, "name asc, age desc");
/// ```
pub fn order_by(sorting: &[SortColumn]) -> String {
    sorting
        .iter()
        .map(|column| {
            let direction = if column.desc { "desc" } else { "asc" };
            format!("{} {}", column.id, direction)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses an `orderBy` clause back into sorting state.
///
/// A field without direction sorts ascending.
pub fn parse_order_by(clause: &str) -> Vec<SortColumn> {
    clause
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let field = words.next()?;
            let desc = words.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            Some(SortColumn::new(field, desc))
        })
        .collect()
}

/// Compares two cell values: numerically when both are numbers, else as text.
/// Empty values sort first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(_), Value::Number(_)) => as_number(a)
                .partial_cmp(&as_number(b))
                .unwrap_or(Ordering::Equal),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => display_string(a).cmp(&display_string(b)),
        },
    }
}

/// Sorts rows in place by the sorting state. Stable.
pub fn sort_rows(rows: &mut [Row], sorting: &[SortColumn]) {
    if sorting.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for column in sorting {
            let ordering = compare_values(a.get(&column.id), b.get(&column.id));
            let ordering = if column.desc { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::add_unique_row_ids;

    #[test]
    fn test_parse_order_by() {
        assert_eq!(
            parse_order_by("name asc, age DESC,city"),
            vec![
                SortColumn::new("name", false),
                SortColumn::new("age", true),
                SortColumn::new("city", false),
            ]
        );
        assert!(parse_order_by("").is_empty());
    }

    #[test]
    fn test_sort_rows_multi_key() {
        let mut rows = add_unique_row_ids(vec![
            json!({"team": "b", "score": 1}),
            json!({"team": "a", "score": 2}),
            json!({"team": "a", "score": 10}),
            json!({"team": null, "score": 5}),
        ]);
        sort_rows(&mut rows, &[SortColumn::new("team", false), SortColumn::new("score", true)]);
        let scores: Vec<_> = rows.iter().map(|r| r.display_value("score")).collect();
        assert_eq!(scores, vec!["5", "10", "2", "1"]);
    }
}
