//! Table rows and their stable identifiers

use std::collections::HashSet;

use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::Map;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

/// Field under which the synthesized row id is exposed to the host.
pub const ROW_ID_FIELD: &str = "_wmTableRowId";

/// Discriminator used for the synthetic "add new row" edit session.
pub const NEW_ROW_ID: &str = "new-row";

/// Field names checked, in order, for an explicit record identifier.
const EXPLICIT_ID_FIELDS: [&str; 3] = ["id", "ID", "Id"];

/// Key used when a non-object value is wrapped into a row.
const WRAPPED_VALUE_FIELD: &str = "dataValue";

/// Stable identifier of a row within a dataset snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Creates a row id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id of the synthetic new-row form.
    pub fn new_row() -> Self {
        Self(NEW_ROW_ID.to_string())
    }

    /// Returns `true` for the synthetic new-row id.
    pub fn is_new_row(&self) -> bool {
        self.0 == NEW_ROW_ID
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A dataset record: arbitrary JSON fields plus a synthesized [`RowId`].
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::model::add_unique_row_ids;
///
/// let rows = add_unique_row_ids(vec![json!({"id": 7, "name": "Ada"})]);
/// assert_eq!(rows[0].id().as_str(), "7");
/// assert_eq!(rows[0].display_value("name"), "Ada");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    fields: Map<String, Value>,
}

impl Row {
    /// Creates a row from an id and its fields.
    ///
    /// A stray `_wmTableRowId` entry in `fields` is dropped; the id lives
    /// beside the fields, never inside them.
    pub fn new(id: RowId, mut fields: Map<String, Value>) -> Self {
        fields.remove(ROW_ID_FIELD);
        Self { id, fields }
    }

    /// Tags a single value found at `index` of its dataset.
    pub fn tagged(value: Value, index: usize) -> Self {
        let fields = into_fields(value);
        let id = derive_row_id(&fields, index);
        Self::new(id, fields)
    }

    /// Returns the row id.
    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a mutable reference to all fields.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if field != ROW_ID_FIELD {
            self.fields.insert(field, value.into());
        }
    }

    /// Consumes the row and returns its fields.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Returns the fields with the row id included, as handed to the host.
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        fields.insert(ROW_ID_FIELD.to_string(), Value::String(self.id.0.clone()));
        Value::Object(fields)
    }

    /// Returns the field rendered as display text.
    ///
    /// Dirty checks and local search compare these strings.
    pub fn display_value(&self, field: &str) -> String {
        self.fields.get(field).map(display_string).unwrap_or_default()
    }
}

impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(ROW_ID_FIELD, &self.id)?;
        map.end()
    }
}

/// Renders a JSON value the way a table cell shows it.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Tags every value of a dataset with a stable, unique row id.
///
/// Re-tagging an already tagged dataset (for example `row.to_value()` of each
/// row) yields identical ids for unchanged rows.
pub fn add_unique_row_ids(values: impl IntoIterator<Item = Value>) -> Vec<Row> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let mut row = Row::tagged(value, index);
            if !seen.insert(row.id.clone()) {
                row.id = RowId(format!("{}-{}", row.id, index));
                seen.insert(row.id.clone());
            }
            row
        })
        .collect()
}

/// Re-tags rows that were already tagged, keeping their order.
pub fn retag_rows(rows: &[Row]) -> Vec<Row> {
    add_unique_row_ids(rows.iter().map(Row::to_value))
}

fn into_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        other => {
            let mut fields = Map::new();
            fields.insert(WRAPPED_VALUE_FIELD.to_string(), other);
            fields
        }
    }
}

fn derive_row_id(fields: &Map<String, Value>, index: usize) -> RowId {
    for key in EXPLICIT_ID_FIELDS {
        match fields.get(key) {
            Some(Value::Null) | None => continue,
            Some(value) => return RowId(display_string(value)),
        }
    }

    // serde_json maps are key-ordered, so the encoding is canonical
    let mut content = fields.clone();
    content.remove(ROW_ID_FIELD);
    let encoded = Value::Object(content).to_string();

    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hasher.update(b":");
    hasher.update(index.to_string().as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    RowId(format!("row-{}", hex))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_explicit_id_wins() {
        let rows = add_unique_row_ids(vec![
            json!({"id": 10, "name": "a"}),
            json!({"ID": "x-1", "name": "b"}),
            json!({"Id": null, "id": null, "name": "c"}),
        ]);
        assert_eq!(rows[0].id().as_str(), "10");
        assert_eq!(rows[1].id().as_str(), "x-1");
        assert!(rows[2].id().as_str().starts_with("row-"));
    }

    #[test]
    fn test_retag_is_stable() {
        let values = vec![json!({"name": "a"}), json!({"name": "b"}), json!({"name": "c"})];
        let first = add_unique_row_ids(values);
        let second = retag_rows(&first);
        let ids: Vec<_> = first.iter().map(|r| r.id().clone()).collect();
        let again: Vec<_> = second.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn test_changed_content_changes_id() {
        let first = add_unique_row_ids(vec![json!({"name": "a", "age": 1})]);
        let changed = add_unique_row_ids(vec![json!({"name": "a", "age": 2})]);
        assert_ne!(first[0].id(), changed[0].id());

        let explicit = add_unique_row_ids(vec![json!({"id": 1, "age": 1})]);
        let explicit_changed = add_unique_row_ids(vec![json!({"id": 1, "age": 2})]);
        assert_eq!(explicit[0].id(), explicit_changed[0].id());
    }

    #[test]
    fn test_duplicate_explicit_ids_are_disambiguated() {
        let rows = add_unique_row_ids(vec![json!({"id": 1}), json!({"id": 1})]);
        assert_ne!(rows[0].id(), rows[1].id());
    }

    #[test]
    fn test_identical_rows_get_distinct_ids() {
        let rows = add_unique_row_ids(vec![json!({"name": "a"}), json!({"name": "a"})]);
        assert_ne!(rows[0].id(), rows[1].id());
    }

    #[test]
    fn test_scalar_values_are_wrapped() {
        let rows = add_unique_row_ids(vec![json!("Apple")]);
        assert_eq!(rows[0].display_value("dataValue"), "Apple");
    }

    #[test]
    fn test_serialize_includes_row_id() {
        let row = Row::new(RowId::new("r1"), Map::new()).set("name", "a");
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({"name": "a", "_wmTableRowId": "r1"}));
    }
}
