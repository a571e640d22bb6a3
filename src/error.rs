//! Crate-wide error type.
//!
//! Every operation reports one of three categories to callers:
//!
//! - [`Error::InvalidInput`] - detected locally before touching the engine
//! - [`Error::NotFound`] - a referenced template, connection or visualization
//!   id does not resolve
//! - everything else - the engine or the app store failed
//!
//! The HTTP layer maps these to 400 / 404 / 500 through [`Error::status`].

use thiserror::Error;

/// Result type for sqlviz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the query, template and store layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad identifier, malformed mapping, missing required field.
    #[error("{0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// SQLite rejected an identifier-safe statement.
    #[error("query failed ({context}): {source}")]
    Query {
        /// Which table / operation was running.
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The statement ran past its deadline and was interrupted.
    #[error("query timed out after {0} ms")]
    Timeout(u64),

    /// The application's own settings store failed.
    #[error("app store error: {0}")]
    Store(#[source] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Coarse classification used by the HTTP layer and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Internal,
}

impl Error {
    /// Create an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap an engine error with the operation that produced it.
    pub fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }

    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err)
    }
}
