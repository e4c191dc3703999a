//! Computing and merging the persisted table state

use std::collections::HashSet;

use super::SelectedItem;
use super::TableState;
use crate::query::FilterSpec;
use crate::query::SortSpec;
use crate::selection::SelectionMode;

/// A part of the state the live table can explicitly change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// Current page.
    Pagination,
    /// Page size.
    PageSize,
    /// Sort.
    Sort,
    /// Selection.
    Selection,
}

/// Snapshot of the live table the state is computed from.
#[derive(Debug, Clone, Copy)]
pub struct StateInput<'a> {
    /// 1-based current page.
    pub page: usize,
    /// Current page size.
    pub page_size: usize,
    /// Selection records, already merged across pages.
    pub selected: &'a [SelectedItem],
    /// Current column filters.
    pub filters: &'a [FilterSpec],
    /// Current sort.
    pub sort: Option<&'a SortSpec>,
    /// Whether the datasource is mid-load.
    pub loading: bool,
}

/// Derives the persisted blob from live table state.
///
/// Precedence, in order:
/// 1. while the datasource is loading the previous result is returned;
/// 2. an active filter (different from the restored one) drops
///    `pagination` and `selectedItem`;
/// 3. otherwise only values that differ from the defaults are kept.
///
/// # Example
///
/// ```
/// use tablekit_lib::persistence::{StateInput, TableStateManager};
/// use tablekit_lib::selection::SelectionMode;
///
/// let mut manager = TableStateManager::new(5, SelectionMode::Multi);
/// let input = StateInput {
///     page: 1,
///     page_size: 5,
///     selected: &[],
///     filters: &[],
///     sort: None,
///     loading: false,
/// };
/// assert!(manager.is_default_state(&input));
/// assert!(manager.compute(&input).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct TableStateManager {
    default_page_size: usize,
    selection_mode: SelectionMode,
    initial: TableState,
    previous: Option<TableState>,
    touched: HashSet<StateField>,
}

impl TableStateManager {
    /// Creates a manager for a table with the given widget defaults.
    pub fn new(default_page_size: usize, selection_mode: SelectionMode) -> Self {
        Self {
            default_page_size,
            selection_mode,
            initial: TableState::default(),
            previous: None,
            touched: HashSet::new(),
        }
    }

    /// Records the state restored at mount.
    pub fn restore(&mut self, initial: TableState) {
        self.initial = initial;
        self.previous = None;
        self.touched.clear();
    }

    /// Returns the state restored at mount.
    pub fn initial(&self) -> &TableState {
        &self.initial
    }

    /// Returns the widget default page size.
    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// Marks a field as explicitly changed by the live table.
    pub fn touch(&mut self, field: StateField) {
        self.touched.insert(field);
    }

    /// Returns `true` if the field was explicitly changed since restore.
    pub fn is_touched(&self, field: StateField) -> bool {
        self.touched.contains(&field)
    }

    /// Returns `true` when the current filters differ from the restored ones.
    pub fn has_active_filter(&self, filters: &[FilterSpec]) -> bool {
        active_filters(filters) != active_filters(&self.initial.search)
    }

    /// Computes the state to persist.
    pub fn compute(&mut self, input: &StateInput<'_>) -> TableState {
        if input.loading {
            if let Some(previous) = &self.previous {
                log::debug!("Datasource loading, keeping previous table state");
                return previous.clone();
            }
        }

        let filter_active = self.has_active_filter(input.filters);
        let pagesize = (input.page_size != self.default_page_size).then_some(input.page_size);
        let mut state = TableState {
            pagesize,
            actualpagesize: pagesize.map(|_| self.default_page_size),
            search: active_filters(input.filters).into_iter().cloned().collect(),
            sort: input
                .sort
                .filter(|sort| self.initial.sort.as_ref() != Some(*sort))
                .cloned(),
            ..TableState::default()
        };
        if !filter_active {
            state.pagination = (input.page > 1).then_some(input.page);
            state.selected_item = input.selected.to_vec();
        }

        self.previous = Some(state.clone());
        state
    }

    /// Merges a freshly computed state with the stored one.
    ///
    /// Without an active filter, fields missing from `new` are kept from
    /// `existing` unless the live table changed them since restore. With an
    /// active filter old positions are dropped outright.
    pub fn merge_with_existing(
        &self,
        new: TableState,
        existing: Option<&TableState>,
        filter_active: bool,
    ) -> TableState {
        let Some(existing) = existing else {
            return new;
        };
        let keep = |field: StateField| !self.is_touched(field);
        let mut merged = new;

        if merged.pagesize.is_none() && keep(StateField::PageSize) {
            merged.pagesize = existing.pagesize;
            merged.actualpagesize = existing.actualpagesize;
        }
        if merged.sort.is_none() && keep(StateField::Sort) {
            merged.sort = existing.sort.clone();
        }
        if filter_active {
            merged.pagination = None;
            merged.selected_item.clear();
            return merged;
        }

        if merged.pagination.is_none() && keep(StateField::Pagination) {
            merged.pagination = existing.pagination;
        }
        if self.selection_mode == SelectionMode::Radio && merged.selected_item.is_empty() {
            merged.selected_item = existing.selected_item.clone();
        }
        merged
    }

    /// Returns `true` when nothing differs from the defaults: page 1, no
    /// selection, no filter, no sort, default page size.
    pub fn is_default_state(&self, input: &StateInput<'_>) -> bool {
        input.page <= 1
            && input.selected.is_empty()
            && active_filters(input.filters).is_empty()
            && input.sort.is_none()
            && input.page_size == self.default_page_size
    }
}

fn active_filters(filters: &[FilterSpec]) -> Vec<&FilterSpec> {
    filters.iter().filter(|f| !f.is_blank()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(page: usize, selected: &'a [SelectedItem], filters: &'a [FilterSpec]) -> StateInput<'a> {
        StateInput {
            page,
            page_size: 5,
            selected,
            filters,
            sort: None,
            loading: false,
        }
    }

    #[test]
    fn test_only_non_defaults_are_kept() {
        let mut manager = TableStateManager::new(5, SelectionMode::Multi);
        let selected = [SelectedItem::new(2, 1)];
        let sort = SortSpec::asc("name");
        let state = manager.compute(&StateInput {
            page_size: 10,
            sort: Some(&sort),
            ..input(2, &selected, &[])
        });
        assert_eq!(state.pagination, Some(2));
        assert_eq!(state.pagesize, Some(10));
        assert_eq!(state.actualpagesize, Some(5));
        assert_eq!(state.selected_item, selected);
        assert_eq!(state.sort, Some(sort));
    }

    #[test]
    fn test_active_filter_drops_positions() {
        let mut manager = TableStateManager::new(5, SelectionMode::Multi);
        let selected = [SelectedItem::new(2, 1)];
        assert_eq!(manager.compute(&input(2, &selected, &[])).pagination, Some(2));

        let filters = [FilterSpec::new("name", "ad")];
        let state = manager.compute(&input(2, &selected, &filters));
        assert_eq!(state.pagination, None);
        assert!(state.selected_item.is_empty());
        assert_eq!(state.search, filters);
    }

    #[test]
    fn test_restored_filter_is_not_active() {
        let mut manager = TableStateManager::new(5, SelectionMode::Radio);
        let filters = vec![FilterSpec::new("name", "ad")];
        manager.restore(TableState {
            search: filters.clone(),
            ..TableState::default()
        });
        assert!(!manager.has_active_filter(&filters));
        assert!(manager.has_active_filter(&[]));
        let selected = [SelectedItem::new(3, 0)];
        assert_eq!(manager.compute(&input(3, &selected, &filters)).pagination, Some(3));
    }

    #[test]
    fn test_loading_returns_previous() {
        let mut manager = TableStateManager::new(5, SelectionMode::Multi);
        let first = manager.compute(&input(2, &[], &[]));
        let during_load = manager.compute(&StateInput {
            loading: true,
            ..input(4, &[], &[])
        });
        assert_eq!(during_load, first);
    }

    #[test]
    fn test_merge_preserves_untouched_fields() {
        let mut manager = TableStateManager::new(5, SelectionMode::Radio);
        let existing = TableState {
            pagination: Some(3),
            pagesize: Some(10),
            actualpagesize: Some(5),
            selected_item: vec![SelectedItem::new(3, 2)],
            sort: Some(SortSpec::desc("age")),
            ..TableState::default()
        };
        let merged = manager.merge_with_existing(TableState::default(), Some(&existing), false);
        assert_eq!(merged, existing);

        manager.touch(StateField::Pagination);
        manager.touch(StateField::Sort);
        let merged = manager.merge_with_existing(TableState::default(), Some(&existing), false);
        assert_eq!(merged.pagination, None);
        assert_eq!(merged.sort, None);
        assert_eq!(merged.pagesize, Some(10));
    }

    #[test]
    fn test_merge_multi_selection_wins_outright() {
        let manager = TableStateManager::new(5, SelectionMode::Multi);
        let existing = TableState {
            selected_item: vec![SelectedItem::new(1, 0)],
            ..TableState::default()
        };
        let merged = manager.merge_with_existing(TableState::default(), Some(&existing), false);
        assert!(merged.selected_item.is_empty());
    }

    #[test]
    fn test_merge_with_filter_is_a_clean_cut() {
        let manager = TableStateManager::new(5, SelectionMode::Radio);
        let existing = TableState {
            pagination: Some(3),
            selected_item: vec![SelectedItem::new(3, 2)],
            ..TableState::default()
        };
        let new = TableState {
            search: vec![FilterSpec::new("name", "x")],
            ..TableState::default()
        };
        let merged = manager.merge_with_existing(new, Some(&existing), true);
        assert_eq!(merged.pagination, None);
        assert!(merged.selected_item.is_empty());
        assert_eq!(merged.search.len(), 1);
    }
}
