//! Error types

mod datasource;
mod storage;
mod validation;

pub use datasource::*;
pub use storage::*;
pub use validation::*;

/// Top-level error for table engine operations.
///
/// Engine entry points invoked from host script never surface these as
/// panics. They are logged, turned into toasts and `on_error` callbacks, and
/// returned to callers that want to inspect them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external datasource failed or returned an unusable response.
    #[error(transparent)]
    Datasource(#[from] DatasourceError),

    /// Reading or writing persisted table state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// One or more fields of the edited row are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation was called in a state that does not support it.
    #[error("Operation skipped: {0}")]
    Misuse(String),
}

impl Error {
    /// Creates a misuse error.
    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse(message.into())
    }

    /// Returns `true` if this error came from the datasource.
    pub fn is_datasource(&self) -> bool {
        matches!(self, Self::Datasource(_))
    }
}
