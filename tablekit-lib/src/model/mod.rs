//! Rows, columns and datasets

mod aggregate;
mod column;
mod dataset;
mod header;
mod row;

pub use aggregate::*;
pub use column::*;
pub use dataset::*;
pub use header::*;
pub use row::*;
