//! Output enum for command execution results.
//!
//! Every command produces exactly one output type. This mapping is
//! deterministic: the same command always produces the same output variant
//! (though the values may differ based on database state).

use crate::Error;
use linkdb_core::Scalar;
use linkdb_storage::PatchStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    /// Document key
    pub key: String,
    /// Collection (shape)
    pub collection: String,
    /// JSON body
    pub body: Value,
}

/// Outcome of a patch on one key of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPatchResult {
    /// Document key
    pub key: String,
    /// Status on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PatchStatus>,
    /// Error on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

/// Outcome of a patch-by-index command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPatchSummary {
    /// Index used
    pub index: String,
    /// Value looked up
    pub query: Scalar,
    /// Keys the index resolved
    pub matched: usize,
    /// Documents changed
    pub patched: usize,
    /// Documents whose patch failed
    pub failed: usize,
    /// Per-key detail, sorted by key
    pub results: Vec<KeyPatchResult>,
}

/// Database counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsView {
    /// Live documents
    pub documents: usize,
    /// Last committed position
    pub position: u64,
    /// Position every index reflects
    pub indexed_through: u64,
    /// Commits not yet indexed
    pub pending_changes: usize,
    /// Registered index names
    pub indexes: Vec<String>,
    /// Durability mode
    pub durability: String,
}

/// Successful command execution results.
///
/// Each [`Command`](crate::Command) variant maps to exactly one `Output`
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No return value (create index, flush, set consistency)
    Unit,

    /// Commit position of a write
    Position(u64),

    /// A document
    Document(DocumentView),

    /// Single-document patch status
    Patch(PatchStatus),

    /// Batched patch summary
    BatchPatch(BatchPatchSummary),

    /// Document keys
    Keys(Vec<String>),

    /// Ping response
    Pong {
        /// Crate version
        version: String,
    },

    /// Database counters
    Stats(StatsView),
}
