//! Error types for LinkDB
//!
//! This module defines all error types used throughout the engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Absence policy
//!
//! `NotFound` is only ever returned by `get` and `delete`. Patch operations
//! treat a missing document as a successful no-op so that retries stay
//! idempotent.

use std::io;
use thiserror::Error;

/// Result type alias for LinkDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the LinkDB engine
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed write: empty key, non-object body, or schema violation
    #[error("invalid document '{key}': {reason}")]
    InvalidDocument {
        /// Key of the rejected document
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// Document does not exist (only surfaced by `get` and `delete`)
    #[error("document not found: {key}")]
    NotFound {
        /// Missing key
        key: String,
    },

    /// Script references a parameter absent from the bindings
    #[error("unbound script parameter: {name}")]
    UnboundParameter {
        /// Parameter name
        name: String,
    },

    /// Script text could not be parsed
    #[error("invalid script: {reason}")]
    InvalidScript {
        /// Parser diagnostic
        reason: String,
    },

    /// Script execution failed against a specific document
    #[error("script failed on '{key}': {reason}")]
    ScriptError {
        /// Document the script was running against
        key: String,
        /// Execution diagnostic
        reason: String,
    },

    /// Index did not reach the required position within the wait bound
    #[error(
        "index '{index}' stale: required position {required}, indexed through {reached} after {waited_ms}ms"
    )]
    IndexStaleTimeout {
        /// Index being waited on
        index: String,
        /// Position the session needs
        required: u64,
        /// Position the index had reached at timeout
        reached: u64,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// No index registered under this name
    #[error("index not found: {name}")]
    IndexNotFound {
        /// Index name
        name: String,
    },

    /// An index with this name is already registered
    #[error("index already exists: {name}")]
    IndexExists {
        /// Index name
        name: String,
    },

    /// A blocking wait was cancelled through its session's cancel handle
    #[error("operation cancelled")]
    Cancelled,

    /// The database was shut down
    #[error("database is shut down")]
    Closed,

    /// I/O error (WAL, config file)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected while reading the WAL
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Build an `InvalidDocument` error.
    pub fn invalid_document(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidDocument {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a `NotFound` error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Build a `ScriptError` for the given document.
    pub fn script(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ScriptError {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that only concern a single document in a batch.
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Error::ScriptError { .. } | Error::InvalidDocument { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
