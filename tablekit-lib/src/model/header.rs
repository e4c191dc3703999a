//! Grouped column headers

use super::Column;

/// A node of the header tree: a column, or a group of nested nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderNode {
    /// A leaf column.
    Column(Column),
    /// A shared header spanning its children.
    Group {
        /// Group name.
        name: String,
        /// Header caption.
        caption: String,
        /// Nested groups and columns.
        children: Vec<HeaderNode>,
    },
}

impl HeaderNode {
    /// Creates a group node.
    pub fn group(
        name: impl Into<String>,
        caption: impl Into<String>,
        children: impl IntoIterator<Item = HeaderNode>,
    ) -> Self {
        Self::Group {
            name: name.into(),
            caption: caption.into(),
            children: children.into_iter().collect(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Column(_) => 1,
            Self::Group { children, .. } => {
                1 + children.iter().map(HeaderNode::depth).max().unwrap_or(0)
            }
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Self::Column(_) => 1,
            Self::Group { children, .. } => children.iter().map(HeaderNode::leaf_count).sum(),
        }
    }
}

impl From<Column> for HeaderNode {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

/// One cell of a rendered header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    /// Caption shown in the cell.
    pub caption: String,
    /// Bound field, for leaf columns.
    pub field: Option<String>,
    /// Number of leaf columns spanned.
    pub colspan: usize,
    /// Number of header rows spanned.
    pub rowspan: usize,
}

/// Lays out the header tree as rows of cells with colspan/rowspan.
///
/// Leaf columns span down to the last header row; groups span their leaf
/// columns. Groups without any leaf columns are omitted.
pub fn header_rows(nodes: &[HeaderNode]) -> Vec<Vec<HeaderCell>> {
    let depth = nodes.iter().map(HeaderNode::depth).max().unwrap_or(0);
    let mut rows = vec![Vec::new(); depth];
    for node in nodes {
        place(node, 0, depth, &mut rows);
    }
    rows
}

fn place(node: &HeaderNode, level: usize, depth: usize, rows: &mut [Vec<HeaderCell>]) {
    match node {
        HeaderNode::Column(column) => rows[level].push(HeaderCell {
            caption: column.caption.clone(),
            field: Some(column.binding.clone()),
            colspan: 1,
            rowspan: depth - level,
        }),
        HeaderNode::Group {
            caption, children, ..
        } => {
            let colspan = node.leaf_count();
            if colspan == 0 {
                return;
            }
            rows[level].push(HeaderCell {
                caption: caption.clone(),
                field: None,
                colspan,
                rowspan: 1,
            });
            for child in children {
                place(child, level + 1, depth, rows);
            }
        }
    }
}

/// Flattens the header tree into its leaf columns, left to right.
pub fn leaf_columns(nodes: &[HeaderNode]) -> Vec<&Column> {
    let mut leaves = Vec::new();
    for node in nodes {
        collect_leaves(node, &mut leaves);
    }
    leaves
}

fn collect_leaves<'a>(node: &'a HeaderNode, leaves: &mut Vec<&'a Column>) {
    match node {
        HeaderNode::Column(column) => leaves.push(column),
        HeaderNode::Group { children, .. } => {
            for child in children {
                collect_leaves(child, leaves);
            }
        }
    }
}
