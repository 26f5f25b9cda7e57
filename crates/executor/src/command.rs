//! Command enum defining all LinkDB operations.
//!
//! Commands are the "instruction set" of LinkDB. Every operation a client can
//! request over the transport is represented as a variant of this enum.
//!
//! Commands are:
//! - **Self-contained**: All parameters needed for execution are in the variant
//! - **Serializable**: Can be converted to/from JSON for cross-language use
//! - **Pure data**: Scripts travel as text and are parsed on execution

use linkdb_core::Scalar;
use linkdb_engine::{IndexDefinition, QueryConsistency};
use linkdb_script::Bindings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command is a self-contained, serializable operation.
///
/// # Command Categories
///
/// | Category | Count | Description |
/// |----------|-------|-------------|
/// | Document | 3 | Put, get, delete by key |
/// | Patch | 2 | Scripted partial update by key or by index |
/// | Index | 2 | Index definition and point lookup |
/// | Session | 1 | Consistency of later index reads |
/// | Database | 3 | Ping, stats, flush |
///
/// # Example
///
/// ```text
/// {"PatchByIndex": {
///     "index": "ScopeIndex",
///     "query": "ContactSpheres-1",
///     "script": "this.Spheres.map(l => if l.Id == sphereId { l.Acl.push(friend) })",
///     "bindings": {"sphereId": "ContactSpheres-1", "friend": "users/1"}
/// }}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Document (3) ====================
    /// Create or replace a document.
    /// Returns: `Output::Position`
    Put {
        /// Document key
        key: String,
        /// Collection (shape) of the document
        collection: String,
        /// JSON object body
        body: Value,
    },

    /// Read a document.
    /// Returns: `Output::Document`
    Get {
        /// Document key
        key: String,
    },

    /// Delete a document.
    /// Returns: `Output::Position`
    Delete {
        /// Document key
        key: String,
    },

    // ==================== Patch (2) ====================
    /// Run a script against one document. A missing key is not an error.
    /// Returns: `Output::Patch`
    Patch {
        /// Document key
        key: String,
        /// Script text
        script: String,
        /// Parameter values
        #[serde(default)]
        bindings: Bindings,
    },

    /// Run a script against every document an index resolves a value to.
    /// Returns: `Output::BatchPatch`
    PatchByIndex {
        /// Index name
        index: String,
        /// Value to look up
        query: Scalar,
        /// Script text
        script: String,
        /// Parameter values
        #[serde(default)]
        bindings: Bindings,
    },

    // ==================== Index (2) ====================
    /// Define an index and backfill it.
    /// Returns: `Output::Unit`
    CreateIndex {
        /// Index definition
        definition: IndexDefinition,
    },

    /// Keys indexed under a value.
    /// Returns: `Output::Keys`
    Query {
        /// Index name
        index: String,
        /// Value to look up
        value: Scalar,
    },

    // ==================== Session (1) ====================
    /// Change the consistency of later index reads in this session.
    /// Returns: `Output::Unit`
    SetConsistency {
        /// New consistency
        consistency: QueryConsistency,
    },

    // ==================== Database (3) ====================
    /// Health check.
    /// Returns: `Output::Pong`
    Ping,

    /// Database counters.
    /// Returns: `Output::Stats`
    Stats,

    /// Fsync the write-ahead log.
    /// Returns: `Output::Unit`
    Flush,
}

impl Command {
    /// Whether the command changes stored data.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Put { .. }
                | Command::Delete { .. }
                | Command::Patch { .. }
                | Command::PatchByIndex { .. }
                | Command::CreateIndex { .. }
        )
    }

    /// Variant name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Put { .. } => "Put",
            Command::Get { .. } => "Get",
            Command::Delete { .. } => "Delete",
            Command::Patch { .. } => "Patch",
            Command::PatchByIndex { .. } => "PatchByIndex",
            Command::CreateIndex { .. } => "CreateIndex",
            Command::Query { .. } => "Query",
            Command::SetConsistency { .. } => "SetConsistency",
            Command::Ping => "Ping",
            Command::Stats => "Stats",
            Command::Flush => "Flush",
        }
    }
}
