//! Error types for the index-inspection collaborator and configuration.
//!
//! Building a pipeline never fails. The only failure surface is the external
//! collaborator consulted by the optimizer, plus environment-driven
//! configuration.

use thiserror::Error;

/// Result type for collaborator operations.
pub type InspectResult<T> = Result<T, InspectError>;

/// Errors reported by an [`IndexInspector`](crate::inspector::IndexInspector).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    /// The collaborator could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A command sent to the collaborator failed.
    #[error("command failed: {0}")]
    Command(String),

    /// The collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The collaborator did not answer in time.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InspectError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    /// Create a collection not found error.
    pub fn collection_not_found(collection: impl Into<String>) -> Self {
        Self::CollectionNotFound(collection.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors raised while reading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be interpreted.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// A required setting is missing.
    #[error("missing required setting: {0}")]
    Missing(String),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a missing setting error.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing(key.into())
    }
}
