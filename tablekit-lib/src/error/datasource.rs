//! Datasource error types

/// Errors reported by a [`Datasource`](crate::datasource::Datasource).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasourceError {
    /// The request reached the datasource and was rejected.
    #[error("Request failed: {message}")]
    Request {
        /// Error message.
        message: String,
        /// Status code, if the datasource reports one.
        status: Option<u16>,
    },

    /// The datasource does not implement the requested operation.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The response did not have the expected shape.
    #[error("Response parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Raw response body, if available.
        body: Option<String>,
    },

    /// The referenced record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),
}

impl DatasourceError {
    /// Creates a new request error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a new request error with a status code.
    pub fn request_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Creates a new unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    /// Creates a new parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: None,
        }
    }

    /// Creates a new parse error with the raw response body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the status code if this is a request error that carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` for shape errors, which callers degrade to "no data".
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
