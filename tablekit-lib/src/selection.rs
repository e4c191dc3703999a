//! Row selection state.
//!
//! Selection is tracked by [`RowId`] so it stays stable while rows are
//! re-fetched, filtered or sorted. Across reloads it is persisted as
//! positional [`SelectedItem`] records instead.

use serde::Deserialize;
use serde::Serialize;

use crate::model::Row;
use crate::model::RowId;
use crate::persistence::SelectedItem;

/// Selection mode of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Rows cannot be selected.
    #[default]
    None,
    /// At most one row is selected; a click replaces the selection.
    Radio,
    /// Any number of rows; a click toggles membership.
    Multi,
}

impl SelectionMode {
    /// Resolves the widget flags. `multiselect` wins over `radioselect`.
    pub fn from_flags(radioselect: bool, multiselect: bool) -> Self {
        match (radioselect, multiselect) {
            (_, true) => Self::Multi,
            (true, false) => Self::Radio,
            (false, false) => Self::None,
        }
    }
}

const INTERACTIVE_TAGS: [&str; 7] = ["input", "button", "select", "textarea", "a", "label", "option"];

const INTERACTIVE_CLASS_PATTERNS: [&str; 8] = [
    "form-control",
    "form-check",
    "btn",
    "app-button",
    "app-checkbox",
    "app-radio",
    "app-textbox",
    "app-select",
];

const INTERACTIVE_ROLES: [&str; 9] = [
    "button", "checkbox", "radio", "textbox", "switch", "combobox", "link", "option", "menuitem",
];

/// Describes the element a row click originated from.
///
/// # Example
///
/// ```
/// use tablekit_lib::selection::ClickTarget;
///
/// assert!(!ClickTarget::cell().is_interactive());
/// assert!(ClickTarget::new("INPUT").is_interactive());
/// assert!(ClickTarget::new("span").with_class("btn btn-primary").is_interactive());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    /// Element tag name, any case.
    pub tag_name: String,
    /// Class names of the element.
    pub class_names: Vec<String>,
    /// `role` attribute.
    pub role: Option<String>,
    /// `data-role` attribute.
    pub data_role: Option<String>,
    /// Whether the element is `contenteditable`.
    pub content_editable: bool,
}

impl ClickTarget {
    /// Creates a target with the given tag name.
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    /// A plain table cell.
    pub fn cell() -> Self {
        Self::new("td")
    }

    /// Adds whitespace-separated class names.
    pub fn with_class(mut self, classes: &str) -> Self {
        self.class_names
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    /// Sets the `role` attribute.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the `data-role` attribute.
    pub fn with_data_role(mut self, role: impl Into<String>) -> Self {
        self.data_role = Some(role.into());
        self
    }

    /// Marks the element `contenteditable`.
    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    /// Returns `true` if the click belongs to an interactive child rather
    /// than to the row itself.
    pub fn is_interactive(&self) -> bool {
        if self.content_editable {
            return true;
        }
        let tag = self.tag_name.to_ascii_lowercase();
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            return true;
        }
        if self
            .class_names
            .iter()
            .any(|class| INTERACTIVE_CLASS_PATTERNS.iter().any(|p| class.contains(p)))
        {
            return true;
        }
        [&self.role, &self.data_role]
            .into_iter()
            .flatten()
            .any(|role| INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
    }
}

/// Id-based row selection with radio/multi semantics.
///
/// # Example
///
/// ```
/// use tablekit_lib::model::RowId;
/// use tablekit_lib::selection::{ClickTarget, RowSelection, SelectionMode};
///
/// let mut selection = RowSelection::new(SelectionMode::Multi);
/// assert!(selection.handle_row_selection_click(&ClickTarget::cell(), &RowId::new("a")));
/// assert!(selection.handle_row_selection_click(&ClickTarget::cell(), &RowId::new("b")));
/// assert_eq!(selection.len(), 2);
/// assert!(!selection.handle_row_selection_click(&ClickTarget::new("button"), &RowId::new("c")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RowSelection {
    mode: SelectionMode,
    /// Selected ids in selection order.
    selected: Vec<RowId>,
    first_row_select: bool,
    first_row_done: bool,
}

impl RowSelection {
    /// Creates an empty selection.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Enables first-row auto-select.
    pub fn with_first_row_select(mut self, enabled: bool) -> Self {
        self.first_row_select = enabled;
        self
    }

    /// Returns the selection mode.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Returns the selected ids in selection order.
    pub fn selected(&self) -> &[RowId] {
        &self.selected
    }

    /// Check if an id is selected.
    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    /// Number of selected rows.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Clear all selection.
    /// Returns the ids that were deselected.
    pub fn clear(&mut self) -> Vec<RowId> {
        std::mem::take(&mut self.selected)
    }

    /// Select a single id, clearing others.
    /// Returns (added, removed) ids.
    pub fn select(&mut self, id: &RowId) -> (Vec<RowId>, Vec<RowId>) {
        let removed: Vec<_> = self.selected.iter().filter(|i| *i != id).cloned().collect();
        let added = if self.is_selected(id) {
            vec![]
        } else {
            vec![id.clone()]
        };
        self.selected = vec![id.clone()];
        (added, removed)
    }

    /// Toggle an id.
    /// Returns (added, removed) ids.
    pub fn toggle(&mut self, id: &RowId) -> (Vec<RowId>, Vec<RowId>) {
        if let Some(pos) = self.selected.iter().position(|i| i == id) {
            self.selected.remove(pos);
            (vec![], vec![id.clone()])
        } else {
            self.selected.push(id.clone());
            (vec![id.clone()], vec![])
        }
    }

    /// Handles a click on a row.
    ///
    /// Returns `false` without touching the selection when the click came
    /// from an interactive child or the table is not selectable.
    pub fn handle_row_selection_click(&mut self, target: &ClickTarget, row_id: &RowId) -> bool {
        if target.is_interactive() {
            log::debug!("Ignoring row click on interactive <{}>", target.tag_name);
            return false;
        }
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Radio => {
                self.select(row_id);
                true
            }
            SelectionMode::Multi => {
                self.toggle(row_id);
                true
            }
        }
    }

    /// Selects every id of the full dataset, or clears the selection.
    ///
    /// Only applies in multi mode; returns `false` otherwise.
    pub fn handle_select_all(&mut self, select: bool, all_ids: &[RowId]) -> bool {
        if self.mode != SelectionMode::Multi {
            return false;
        }
        if select {
            for id in all_ids {
                if !self.is_selected(id) {
                    self.selected.push(id.clone());
                }
            }
        } else {
            self.selected.clear();
        }
        true
    }

    /// Drops ids that no longer exist in `rows`.
    ///
    /// Losing a selected row re-arms first-row auto-select.
    /// Returns the dropped ids.
    pub fn retain_existing(&mut self, rows: &[Row]) -> Vec<RowId> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.selected)
            .into_iter()
            .partition(|id| rows.iter().any(|row| row.id() == id));
        self.selected = kept;
        if !dropped.is_empty() {
            self.first_row_done = false;
        }
        dropped
    }

    /// Selects the first row once, when enabled, nothing is selected and
    /// `rows` is non-empty. Returns the id selected.
    pub fn apply_first_row_select(&mut self, rows: &[Row]) -> Option<RowId> {
        if !self.first_row_select || self.first_row_done || self.mode == SelectionMode::None {
            return None;
        }
        let first = rows.first()?;
        self.first_row_done = true;
        if !self.selected.is_empty() {
            return None;
        }
        self.selected.push(first.id().clone());
        Some(first.id().clone())
    }

    /// Computes the positional records to persist.
    ///
    /// `page` is 1-based and `page_rows` are the rows visible on it. Radio
    /// replaces `existing` wholesale; multi keeps entries of other pages and
    /// recomputes the current page only.
    pub fn persisted_items(
        &self,
        page: usize,
        page_rows: &[Row],
        existing: &[SelectedItem],
    ) -> Vec<SelectedItem> {
        let current = page_rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.is_selected(row.id()))
            .map(|(index, _)| SelectedItem { page, index });

        match self.mode {
            SelectionMode::None => Vec::new(),
            SelectionMode::Radio => current.take(1).collect(),
            SelectionMode::Multi => {
                let mut items: Vec<SelectedItem> = existing
                    .iter()
                    .filter(|item| item.page != page)
                    .copied()
                    .chain(current)
                    .collect();
                items.sort();
                items.dedup();
                items
            }
        }
    }

    /// Computes the positional records from the whole ordered dataset.
    ///
    /// Each selected id is located in `rows` and its absolute index split
    /// into page and index for `page_size`. Ids missing from `rows` are
    /// left out. Radio keeps the first selected id only.
    pub fn positions(&self, rows: &[Row], page_size: usize) -> Vec<SelectedItem> {
        let page_size = page_size.max(1);
        let ids: &[RowId] = match self.mode {
            SelectionMode::None => return Vec::new(),
            SelectionMode::Radio => &self.selected[..self.selected.len().min(1)],
            SelectionMode::Multi => &self.selected,
        };
        let mut items: Vec<SelectedItem> = ids
            .iter()
            .filter_map(|id| rows.iter().position(|row| row.id() == id))
            .map(|absolute| SelectedItem::new(absolute / page_size + 1, absolute % page_size))
            .collect();
        items.sort();
        items
    }

    /// Resolves persisted records back to row ids and selects them.
    ///
    /// With [`RestoreRows::AllPages`] `rows` is the whole dataset and every
    /// record resolves through its absolute index. With
    /// [`RestoreRows::Page`] only `rows` of that page are loaded, so only
    /// records of that page resolve. Returns the ids selected.
    pub fn restore(
        &mut self,
        items: &[SelectedItem],
        rows: &[Row],
        page_size: usize,
        scope: RestoreRows,
    ) -> Vec<RowId> {
        let page_size = page_size.max(1);
        let resolved: Vec<RowId> = items
            .iter()
            .filter_map(|item| {
                let position = match scope {
                    RestoreRows::AllPages => item.absolute_index(page_size),
                    RestoreRows::Page(page) if item.page == page => item.index,
                    RestoreRows::Page(_) => return None,
                };
                rows.get(position).map(|row| row.id().clone())
            })
            .collect();

        match self.mode {
            SelectionMode::None => return Vec::new(),
            SelectionMode::Radio => self.selected = resolved.into_iter().take(1).collect(),
            SelectionMode::Multi => {
                self.selected.clear();
                for id in resolved {
                    if !self.is_selected(&id) {
                        self.selected.push(id);
                    }
                }
            }
        }
        if !self.selected.is_empty() {
            self.first_row_done = true;
        }
        self.selected.clone()
    }
}

/// Which rows [`RowSelection::restore`] receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreRows {
    /// The full dataset (client-side pagination).
    AllPages,
    /// Only the given 1-based page (server-side pagination).
    Page(usize),
}
