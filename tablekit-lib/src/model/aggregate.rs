//! Column aggregates for summary rows

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::Row;

/// Aggregate function applied over every value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    /// Sum of numeric values.
    Sum,
    /// Mean of numeric values.
    Average,
    /// Number of non-empty values.
    Count,
    /// Smallest numeric value.
    #[serde(alias = "minimum")]
    Min,
    /// Largest numeric value.
    #[serde(alias = "maximum")]
    Max,
    /// Share of rows with a truthy value, as a percentage.
    Percent,
}

impl AggregateFn {
    /// Computes the aggregate over `field` of `rows`.
    ///
    /// Non-numeric values are ignored by the numeric functions. Returns `None`
    /// when there is nothing to aggregate.
    pub fn compute(self, rows: &[Row], field: &str) -> Option<f64> {
        let values = rows.iter().filter_map(|row| row.get(field));
        match self {
            Self::Count => Some(values.filter(|v| !is_empty(v)).count() as f64),
            Self::Percent => {
                if rows.is_empty() {
                    return None;
                }
                let truthy = values.filter(|v| is_truthy(v)).count();
                Some(truthy as f64 * 100.0 / rows.len() as f64)
            }
            Self::Sum => {
                let numbers: Vec<f64> = values.filter_map(as_number).collect();
                (!numbers.is_empty()).then(|| numbers.iter().sum())
            }
            Self::Average => {
                let numbers: Vec<f64> = values.filter_map(as_number).collect();
                (!numbers.is_empty()).then(|| numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
            Self::Min => values.filter_map(as_number).reduce(f64::min),
            Self::Max => values.filter_map(as_number).reduce(f64::max),
        }
    }
}

/// Reads a JSON value as a number, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Lazily computed aggregates over the full dataset.
///
/// Results are cached per `(field, function)` until the dataset version
/// changes.
#[derive(Debug, Default)]
pub struct AggregateCache {
    version: u64,
    values: HashMap<(String, AggregateFn), Option<f64>>,
}

impl AggregateCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate, computing it if the cache is stale.
    pub fn get(&mut self, version: u64, rows: &[Row], field: &str, function: AggregateFn) -> Option<f64> {
        if version != self.version {
            self.values.clear();
            self.version = version;
        }
        *self
            .values
            .entry((field.to_string(), function))
            .or_insert_with(|| function.compute(rows, field))
    }
}
