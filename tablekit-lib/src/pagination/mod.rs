//! Client- and server-side pagination.
//!
//! [`Paginator`] behaves the same whether rows come from an in-memory
//! [`Dataset`](crate::model::Dataset) (pages are slices) or from a pageable
//! [`Datasource`](crate::datasource::Datasource) (pages are fetched and
//! bounded by the server's [`PageMeta`](crate::datasource::PageMeta)).

mod paginator;

pub use paginator::*;

use serde::Deserialize;
use serde::Serialize;

use crate::persistence::SelectedItem;

/// How page transitions are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// Numbered pager with jump.
    #[default]
    #[serde(alias = "Basic", alias = "pager-jump")]
    Basic,
    /// Page-number input.
    #[serde(alias = "Classic")]
    Classic,
    /// Previous/next only.
    #[serde(alias = "Pager")]
    Pager,
    /// Infinite scroll; rows accumulate.
    #[serde(alias = "Scroll")]
    Scroll,
    /// "Load more" button; rows accumulate.
    #[serde(rename = "ondemand", alias = "On-Demand", alias = "onDemand")]
    OnDemand,
    /// Inline navigation.
    #[serde(alias = "Inline")]
    Inline,
    /// No navigation controls.
    #[serde(alias = "None")]
    None,
}

impl NavigationMode {
    /// Returns `true` if rows accumulate instead of being replaced per page.
    pub fn is_accumulating(self) -> bool {
        matches!(self, Self::Scroll | Self::OnDemand)
    }

    /// Returns `false` for modes without a stable page to persist.
    pub fn supports_persistence(self) -> bool {
        !matches!(self, Self::Scroll | Self::OnDemand | Self::Inline)
    }
}

/// Target of [`Paginator::navigate_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Page 1.
    First,
    /// The previous page.
    Prev,
    /// The next page.
    Next,
    /// The last page.
    Last,
}

/// Snapshot of the pagination state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    /// 0-based page index.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Number of pages, at least 1.
    pub page_count: usize,
    /// Total rows (server: total elements).
    pub data_size: usize,
}

impl PaginationState {
    /// Returns the 1-based page number.
    pub fn page(&self) -> usize {
        self.page_index + 1
    }
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The paginator now shows this 1-based page.
    Navigated(usize),
    /// Nothing to do (boundary, or already there).
    Unchanged,
    /// The fetch failed and the paginator went back to this page.
    RolledBack(usize),
    /// A fetch was already in flight; nothing was started.
    AlreadyFetching,
}

/// Reprojects persisted selections from one page size to another.
///
/// # Example
///
/// ```
/// use tablekit_lib::pagination::reproject_selected;
/// use tablekit_lib::persistence::SelectedItem;
///
/// let items = [SelectedItem::new(1, 0), SelectedItem::new(1, 2)];
/// assert_eq!(reproject_selected(&items, 5, 10), items.to_vec());
/// ```
pub fn reproject_selected(items: &[SelectedItem], old_size: usize, new_size: usize) -> Vec<SelectedItem> {
    let mut reprojected: Vec<_> = items
        .iter()
        .map(|item| item.reproject(old_size, new_size))
        .collect();
    reprojected.sort();
    reprojected.dedup();
    reprojected
}
