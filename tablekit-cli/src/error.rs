//! CLI errors

use std::path::PathBuf;

use tablekit_lib::error::StorageError;

/// Errors surfaced to the command line.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading a dataset file failed.
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The dataset is not JSON.
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The dataset is JSON but not an array of records.
    #[error("{} does not hold a JSON array", .0.display())]
    NotAnArray(PathBuf),

    /// A `--filter` argument is not `field=value`.
    #[error("Invalid filter `{0}`, expected field=value")]
    InvalidFilter(String),

    /// No platform data directory.
    #[error("Cannot determine the data directory")]
    NoDataDir,

    /// Creating a directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state database failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The table engine failed.
    #[error(transparent)]
    Table(#[from] tablekit_lib::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
