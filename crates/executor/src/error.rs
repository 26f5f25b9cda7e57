//! Error types for command execution.
//!
//! All errors from command execution are represented by the [`Error`] enum.
//! These errors are:
//! - **Structured**: Each variant has typed fields for error details
//! - **Serializable**: Can be converted to/from JSON
//! - **Lossless**: Engine error details survive the conversion

use serde::{Deserialize, Serialize};

/// Command execution errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Not Found | `DocumentNotFound`, `IndexNotFound` | Entity doesn't exist |
/// | Validation | `InvalidDocument`, `InvalidScript`, `UnboundParameter` | Bad input |
/// | Execution | `ScriptFailed` | Script failed on one document |
/// | Consistency | `IndexStale`, `Cancelled` | Read-your-writes wait did not finish |
/// | State | `IndexExists`, `Closed` | Invalid state transition |
/// | System | `Io`, `Serialization`, `Corruption`, `Config` | Infrastructure errors |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Document not found
    #[error("document not found: {key}")]
    DocumentNotFound {
        /// Missing key
        key: String,
    },

    /// Index not found
    #[error("index not found: {name}")]
    IndexNotFound {
        /// Index name
        name: String,
    },

    // ==================== Validation ====================
    /// Document rejected on write
    #[error("invalid document '{key}': {reason}")]
    InvalidDocument {
        /// Document key
        key: String,
        /// What was wrong
        reason: String,
    },

    /// Script text did not parse
    #[error("invalid script: {reason}")]
    InvalidScript {
        /// Parser diagnostic
        reason: String,
    },

    /// Script parameter without a binding
    #[error("unbound script parameter: {name}")]
    UnboundParameter {
        /// Parameter name
        name: String,
    },

    // ==================== Execution ====================
    /// Script failed on a document
    #[error("script failed on '{key}': {reason}")]
    ScriptFailed {
        /// Document key
        key: String,
        /// Execution diagnostic
        reason: String,
    },

    // ==================== Consistency ====================
    /// Index did not catch up with the session's writes in time
    #[error("index '{index}' stale: required {required}, reached {reached} after {waited_ms}ms")]
    IndexStale {
        /// Index name
        index: String,
        /// Position the session needed
        required: u64,
        /// Position the index reached
        reached: u64,
        /// Time waited
        waited_ms: u64,
    },

    /// Wait aborted through the session's cancel handle
    #[error("operation cancelled")]
    Cancelled,

    // ==================== State ====================
    /// Index name already taken
    #[error("index already exists: {name}")]
    IndexExists {
        /// Index name
        name: String,
    },

    /// Database shut down
    #[error("database is shut down")]
    Closed,

    // ==================== System ====================
    /// I/O failure
    #[error("I/O error: {reason}")]
    Io {
        /// Description
        reason: String,
    },

    /// Encoding failure
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description
        reason: String,
    },

    /// Stored data is corrupt
    #[error("data corruption: {reason}")]
    Corruption {
        /// Description
        reason: String,
    },

    /// Invalid configuration
    #[error("invalid configuration: {reason}")]
    Config {
        /// Description
        reason: String,
    },
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;
