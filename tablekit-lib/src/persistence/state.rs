//! The persisted table state blob

use serde::Deserialize;
use serde::Serialize;

use crate::query::FilterSpec;
use crate::query::SortSpec;

/// A selection persisted by position: the 1-based page it was made on and
/// the row index within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelectedItem {
    /// 1-based page.
    pub page: usize,
    /// Index within the page.
    pub index: usize,
}

impl SelectedItem {
    /// Creates a record.
    pub fn new(page: usize, index: usize) -> Self {
        Self { page, index }
    }

    /// Returns the index within the whole dataset.
    pub fn absolute_index(self, page_size: usize) -> usize {
        self.page.saturating_sub(1) * page_size + self.index
    }

    /// Re-expresses the record for a different page size.
    ///
    /// # Example
    ///
    /// ```
    /// use tablekit_lib::persistence::SelectedItem;
    ///
    /// let item = SelectedItem::new(2, 1);
    /// assert_eq!(item.reproject(5, 10), SelectedItem::new(1, 6));
    /// assert_eq!(item.reproject(5, 10).reproject(10, 5), item);
    /// ```
    pub fn reproject(self, old_size: usize, new_size: usize) -> Self {
        let new_size = new_size.max(1);
        let absolute = self.absolute_index(old_size.max(1));
        Self {
            page: absolute / new_size + 1,
            index: absolute % new_size,
        }
    }
}

/// The JSON blob persisted per table name and storage scope.
///
/// Every key is optional and absent keys mean "use the default". Only
/// non-default values are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// 1-based page, when not the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<usize>,
    /// Page size, when not the widget default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagesize: Option<usize>,
    /// The widget default page size at the time `pagesize` was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actualpagesize: Option<usize>,
    /// Selected rows by position.
    #[serde(rename = "selectedItem", default, skip_serializing_if = "Vec::is_empty")]
    pub selected_item: Vec<SelectedItem>,
    /// Active column filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<FilterSpec>,
    /// Active sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl TableState {
    /// Returns `true` if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns the persisted page size if it was saved against the same
    /// widget default, else `None`.
    pub fn effective_page_size(&self, default_page_size: usize) -> Option<usize> {
        let size = self.pagesize.filter(|size| *size > 0)?;
        match self.actualpagesize {
            Some(actual) if actual != default_page_size => None,
            _ => Some(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialized_keys() {
        let state = TableState {
            pagination: Some(2),
            selected_item: vec![SelectedItem::new(2, 0)],
            sort: Some(SortSpec::desc("name")),
            ..TableState::default()
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "pagination": 2,
                "selectedItem": [{"page": 2, "index": 0}],
                "sort": {"field": "name", "direction": "desc"}
            })
        );
        assert_eq!(serde_json::to_value(TableState::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_reprojection_round_trips() {
        for (page, index) in [(1, 0), (1, 4), (2, 2), (3, 1)] {
            let item = SelectedItem::new(page, index);
            for new_size in [1, 3, 7, 10] {
                assert_eq!(item.reproject(5, new_size).reproject(new_size, 5), item);
            }
        }
    }

    #[test]
    fn test_stale_page_size_is_ignored() {
        let state = TableState {
            pagesize: Some(20),
            actualpagesize: Some(5),
            ..TableState::default()
        };
        assert_eq!(state.effective_page_size(5), Some(20));
        assert_eq!(state.effective_page_size(10), None);
    }
}
