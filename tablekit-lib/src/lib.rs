//! Data table engine library
//!
//! The state behind data-table, pagination and search widgets: row identity,
//! client and server pagination, selection, inline editing with validation,
//! persisted table state, and debounced search.
//!
//! [`table::DataTable`] ties the pieces together for one widget; the
//! modules below can also be used on their own.

pub mod cell_state;
pub mod columns;
pub mod config;
pub mod datasource;
pub mod edit;
pub mod edited_rows;
pub mod error;
pub mod events;
pub mod export;
pub mod model;
pub mod pagination;
pub mod persistence;
pub mod query;
pub mod registry;
pub mod search;
pub mod selection;
pub mod server;
pub mod table;

mod util;

pub use error::Error;
pub use table::DataTable;
pub use table::TableHandle;
