//! Column definitions

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::AggregateFn;

/// Data type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Free text.
    #[default]
    String,
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// true / false.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    Datetime,
}

impl DataType {
    /// Returns `true` for numeric types.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Integer)
    }
}

/// Widget used to edit a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditWidget {
    /// Single line text input.
    #[default]
    Text,
    /// Numeric input.
    Number,
    /// Multi line text input.
    Textarea,
    /// Dropdown.
    Select,
    /// Checkbox.
    Checkbox,
    /// Date picker.
    Date,
    /// Not editable.
    None,
}

/// Device classes a column can be shown or hidden on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Phone-sized viewport.
    Mobile,
    /// Tablet-sized viewport.
    Tablet,
    /// Desktop viewport.
    Desktop,
}

/// Per-device visibility of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVisibility {
    /// Shown on phones.
    #[serde(default = "default_true")]
    pub mobile: bool,
    /// Shown on tablets.
    #[serde(default = "default_true")]
    pub tablet: bool,
    /// Shown on desktops.
    #[serde(default = "default_true")]
    pub desktop: bool,
}

impl Default for DeviceVisibility {
    fn default() -> Self {
        Self {
            mobile: true,
            tablet: true,
            desktop: true,
        }
    }
}

impl DeviceVisibility {
    /// Returns whether the column is shown on the given device class.
    pub fn shows_on(&self, device: DeviceClass) -> bool {
        match device {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Tablet => self.tablet,
            DeviceClass::Desktop => self.desktop,
        }
    }
}

/// Input type used for constraint validation of edited values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Any text.
    #[default]
    Text,
    /// Must parse as a number.
    Number,
    /// Must be an email address.
    Email,
    /// Must be an absolute http(s) URL.
    Url,
}

/// Constraints checked when an edited row is saved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConstraints {
    /// Regular expression the whole value must match.
    pub regexp: Option<String>,
    /// Minimum length in characters.
    pub minlength: Option<usize>,
    /// Maximum length in characters.
    pub maxlength: Option<usize>,
    /// Minimum numeric value.
    pub minvalue: Option<f64>,
    /// Maximum numeric value.
    pub maxvalue: Option<f64>,
    /// Expected input type.
    pub inputtype: InputType,
}

/// A table column bound to a row field.
///
/// Deserializes from the widget's column markup attributes.
///
/// # Example
///
/// ```
/// use tablekit_lib::model::Column;
///
/// let column = Column::new("name", "Name").required(true);
/// assert!(column.required);
/// assert!(column.sortable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    /// Field the column binds to.
    pub binding: String,
    /// Header caption.
    pub caption: String,
    /// Data type.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Whether the column can be sorted.
    pub sortable: bool,
    /// Whether the column takes part in search/filter.
    pub searchable: bool,
    /// Whether the column is shown at all.
    pub show: bool,
    /// Per-device visibility.
    #[serde(flatten)]
    pub visibility: DeviceVisibility,
    /// Edit widget type.
    pub editwidgettype: EditWidget,
    /// Whether a value is required when saving an edited row.
    pub required: bool,
    /// Whether the column may be edited.
    pub readonly: bool,
    /// Value seeded into the new-row form.
    pub defaultvalue: Option<Value>,
    /// Save-time validation constraints.
    #[serde(flatten)]
    pub constraints: FieldConstraints,
    /// Aggregate shown in the summary row.
    pub aggregate: Option<AggregateFn>,
    /// Expression exported instead of the raw field.
    pub expression: Option<String>,
    /// Column holding row action buttons rather than data.
    pub rowoperations: bool,
    /// Width hint.
    pub width: Option<String>,
    /// Text alignment hint.
    pub textalignment: Option<String>,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            binding: String::new(),
            caption: String::new(),
            data_type: DataType::default(),
            sortable: true,
            searchable: true,
            show: true,
            visibility: DeviceVisibility::default(),
            editwidgettype: EditWidget::default(),
            required: false,
            readonly: false,
            defaultvalue: None,
            constraints: FieldConstraints::default(),
            aggregate: None,
            expression: None,
            rowoperations: false,
            width: None,
            textalignment: None,
        }
    }
}

impl Column {
    /// Creates a column bound to `binding` with a header caption.
    pub fn new(binding: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            caption: caption.into(),
            ..Self::default()
        }
    }

    /// Sets the data type.
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Marks the column required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets whether the column is sortable.
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Sets whether the column is searchable.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Marks the column read-only.
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Sets the new-row default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.defaultvalue = Some(value.into());
        self
    }

    /// Sets the validation constraints.
    pub fn constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the summary aggregate.
    pub fn aggregate(mut self, aggregate: AggregateFn) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Sets the per-device visibility.
    pub fn visibility(mut self, visibility: DeviceVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Marks this as the row-operations column.
    pub fn row_operations(mut self) -> Self {
        self.rowoperations = true;
        self.editwidgettype = EditWidget::None;
        self
    }

    /// Returns `true` if the column holds data (not row actions).
    pub fn is_data_column(&self) -> bool {
        !self.rowoperations && !self.binding.is_empty()
    }

    /// Returns `true` if the column is editable in an edit session.
    pub fn is_editable(&self) -> bool {
        self.is_data_column() && !self.readonly && self.editwidgettype != EditWidget::None
    }

    /// Returns `true` if the column is shown on the given device.
    pub fn is_visible_on(&self, device: DeviceClass) -> bool {
        self.show && self.visibility.shows_on(device)
    }
}

fn default_true() -> bool {
    true
}

/// Returns the data columns shown on `device`, in order.
pub fn visible_columns(columns: &[Column], device: DeviceClass) -> Vec<&Column> {
    columns
        .iter()
        .filter(|column| column.is_data_column() && column.is_visible_on(device))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_markup_attributes() {
        let column: Column = serde_json::from_value(json!({
            "binding": "price",
            "caption": "Price",
            "type": "number",
            "required": true,
            "mobile": false,
            "minvalue": 0.0,
            "aggregate": "sum"
        }))
        .unwrap();

        assert_eq!(column.data_type, DataType::Number);
        assert!(column.required);
        assert!(!column.visibility.mobile);
        assert!(column.visibility.desktop);
        assert_eq!(column.constraints.minvalue, Some(0.0));
        assert_eq!(column.aggregate, Some(AggregateFn::Sum));
        assert!(column.sortable);
    }

    #[test]
    fn test_visible_columns_by_device() {
        let columns = vec![
            Column::new("a", "A"),
            Column::new("b", "B").visibility(DeviceVisibility {
                mobile: false,
                ..DeviceVisibility::default()
            }),
            Column::new("", "Actions").row_operations(),
        ];

        let mobile: Vec<_> = visible_columns(&columns, DeviceClass::Mobile)
            .into_iter()
            .map(|c| c.binding.as_str())
            .collect();
        assert_eq!(mobile, vec!["a"]);
        assert_eq!(visible_columns(&columns, DeviceClass::Desktop).len(), 2);
    }
}
