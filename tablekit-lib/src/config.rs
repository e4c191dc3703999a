//! Widget configuration

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::edit::EditMode;
use crate::pagination::NavigationMode;
use crate::persistence::StorageScope;
use crate::query::MatchMode;
use crate::selection::SelectionMode;

/// Page size when the widget does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Debounce applied to server-side sort/filter requests.
pub const DEFAULT_QUERY_DEBOUNCE: Duration = Duration::from_millis(100);

/// Debounce applied to search typing.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Toast messages per operation category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Shown after a successful insert.
    pub insertmessage: String,
    /// Shown after a successful update.
    pub updatemessage: String,
    /// Shown after a successful delete.
    pub deletemessage: String,
    /// Shown when a datasource operation fails.
    pub errormessage: String,
    /// Shown when saving a row without changes.
    pub nochangesmessage: String,
    /// Shown when there is no data.
    pub nodatamessage: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            insertmessage: "Record added successfully".to_string(),
            updatemessage: "Record updated successfully".to_string(),
            deletemessage: "Record deleted successfully".to_string(),
            errormessage: "An error occurred. Please try again.".to_string(),
            nochangesmessage: "No changes detected".to_string(),
            nodatamessage: "No data found.".to_string(),
        }
    }
}

/// Configuration of a data table, as given by the widget's properties.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablekit_lib::config::TableConfig;
/// use tablekit_lib::selection::SelectionMode;
///
/// let config: TableConfig = serde_json::from_value(json!({
///     "name": "employees",
///     "pagesize": 10,
///     "multiselect": true,
///     "radioselect": true
/// }))
/// .unwrap();
/// assert_eq!(config.selection_mode(), SelectionMode::Multi);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Widget name; scopes cell state and persisted state.
    pub name: String,
    /// Default page size.
    pub pagesize: usize,
    /// Navigation mode.
    pub navigation: NavigationMode,
    /// Edit mode.
    pub editmode: EditMode,
    /// Single selection.
    pub radioselect: bool,
    /// Multiple selection; wins over `radioselect`.
    pub multiselect: bool,
    /// Select the first row on load.
    pub gridfirstrowselect: bool,
    /// Where table state is persisted; `None` disables persistence.
    pub statehandler: Option<StorageScope>,
    /// Toast messages.
    #[serde(flatten)]
    pub messages: Messages,
    /// Debounce for server-side sort/filter requests.
    #[serde(skip)]
    pub query_debounce: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            pagesize: DEFAULT_PAGE_SIZE,
            navigation: NavigationMode::default(),
            editmode: EditMode::default(),
            radioselect: false,
            multiselect: false,
            gridfirstrowselect: false,
            statehandler: None,
            messages: Messages::default(),
            query_debounce: DEFAULT_QUERY_DEBOUNCE,
        }
    }
}

impl TableConfig {
    /// Creates a config for the named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.pagesize = size.max(1);
        self
    }

    /// Sets the navigation mode.
    pub fn with_navigation(mut self, navigation: NavigationMode) -> Self {
        self.navigation = navigation;
        self
    }

    /// Sets the edit mode.
    pub fn with_edit_mode(mut self, mode: EditMode) -> Self {
        self.editmode = mode;
        self
    }

    /// Sets radio / multi selection flags.
    pub fn with_selection(mut self, radioselect: bool, multiselect: bool) -> Self {
        self.radioselect = radioselect;
        self.multiselect = multiselect;
        self
    }

    /// Enables first-row auto-select.
    pub fn with_first_row_select(mut self, enabled: bool) -> Self {
        self.gridfirstrowselect = enabled;
        self
    }

    /// Enables persistence in the given scope.
    pub fn with_state_handler(mut self, scope: StorageScope) -> Self {
        self.statehandler = Some(scope);
        self
    }

    /// Sets the server query debounce.
    pub fn with_query_debounce(mut self, debounce: Duration) -> Self {
        self.query_debounce = debounce;
        self
    }

    /// Returns the effective selection mode.
    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_flags(self.radioselect, self.multiselect)
    }

    /// Returns the persistence scope, or `None` when the navigation mode
    /// opts out of persistence.
    pub fn persistence_scope(&self) -> Option<StorageScope> {
        self.statehandler.filter(|_| self.navigation.supports_persistence())
    }
}

/// Configuration of a search widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fields searched; empty searches every field.
    #[serde(deserialize_with = "comma_list")]
    pub searchkey: Vec<String>,
    /// Matching policy.
    pub matchmode: MatchMode,
    /// Case-sensitive matching.
    pub casesensitive: bool,
    /// Minimum query length before searching.
    pub minchars: usize,
    /// Maximum results returned; 0 means unlimited.
    pub limit: usize,
    /// Debounce applied to typing, in milliseconds on the wire.
    #[serde(rename = "debouncetime", with = "millis")]
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            searchkey: Vec::new(),
            matchmode: MatchMode::default(),
            casesensitive: false,
            minchars: 1,
            limit: 0,
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

impl SearchConfig {
    /// Sets the searched keys.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.searchkey = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the match mode.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.matchmode = mode;
        self
    }

    /// Sets case sensitivity.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.casesensitive = case_sensitive;
        self
    }

    /// Sets the minimum query length.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.minchars = min_chars;
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the typing debounce.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Accepts `"a, b"` or `["a", "b"]`.
fn comma_list<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keys {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Keys::deserialize(deserializer)? {
        Keys::Joined(s) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        Keys::List(keys) => keys,
    })
}
