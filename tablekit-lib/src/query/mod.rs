//! Filter and sort vocabulary shared by tables, datasources and search.
//!
//! - [`MatchMode`] - string matching policy (`contains`, `start`, `end`, `exact`)
//! - [`FilterSpec`] - one column filter, as persisted and sent to datasources
//! - [`SortSpec`] / [`SortColumn`] - persisted sort and in-memory sorting state

mod filter;
mod order;

pub use filter::*;
pub use order::*;
