//! Error types for MongoDB operations.

use aggkit_core::InspectError;
use mongodb::error::ErrorKind;
use thiserror::Error;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Server error code for a missing namespace.
pub(crate) const NAMESPACE_NOT_FOUND: i32 = 26;

/// Errors that can occur during MongoDB operations.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the server reported a missing collection.
    pub fn is_namespace_not_found(&self) -> bool {
        match self {
            Self::Driver(e) => {
                matches!(e.kind.as_ref(), ErrorKind::Command(cmd) if cmd.code == NAMESPACE_NOT_FOUND)
            }
            _ => false,
        }
    }
}

impl From<MongoError> for InspectError {
    fn from(err: MongoError) -> Self {
        match err {
            MongoError::Driver(e) => {
                let msg = e.to_string();

                if matches!(
                    e.kind.as_ref(),
                    ErrorKind::ServerSelection { .. } | ErrorKind::Io(_)
                ) {
                    return InspectError::connection(msg);
                }
                if let ErrorKind::Command(cmd) = e.kind.as_ref() {
                    if cmd.code == NAMESPACE_NOT_FOUND {
                        return InspectError::collection_not_found(cmd.message.clone());
                    }
                }

                InspectError::command(msg)
            }
            MongoError::Config(msg) => InspectError::connection(msg),
            MongoError::Connection(msg) => InspectError::connection(msg),
            MongoError::Query(msg) => InspectError::command(msg),
            MongoError::Timeout(ms) => InspectError::Timeout(ms),
        }
    }
}
