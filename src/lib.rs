//! LinkDB - embedded document store with scripted patches and map indexes
//!
//! Documents embed denormalized copies of the documents they link to. When a
//! linked document changes, every copy is fixed up with a small patch script
//! applied to each document an index resolves.
//!
//! # Quick Start
//!
//! ```ignore
//! use linkdb::{Bindings, Database, DocKey, Document, IndexDefinition, Scalar, Script};
//!
//! let db = Database::in_memory()?;
//! db.create_index(&IndexDefinition::link_ids("ScopeIndex", &["SocialMasks"], "Spheres"))?;
//!
//! let session = db.session();
//! session.put(DocKey::from("SocialMasks-1"), Document::new("SocialMasks", body))?;
//!
//! let script = Script::parse(
//!     "this.Spheres.map(l => if l.Id == sphereId { l.Acl.push(friend) })",
//! )?;
//! let result = session.patch_by_index(
//!     "ScopeIndex",
//!     &Scalar::from("ContactSpheres-1"),
//!     &script,
//!     &Bindings::new().with("sphereId", "ContactSpheres-1").with("friend", "users/1"),
//! )?;
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate |
//! |-------|-------|
//! | Documents, links, errors | `linkdb-core` |
//! | Patch script language | `linkdb-script` |
//! | Document store, WAL, change feed | `linkdb-storage` |
//! | Indexes, sessions, batched patches | `linkdb-engine` |
//! | Serializable command surface | `linkdb-executor` |
//!
//! The engine types are re-exported at the root. The command surface lives
//! under [`command`] because its `Session` and `Error` shadow the engine's.

pub use linkdb_core::{
    DocKey, Document, Error, IndexTerm, Link, LinkSnapshot, Result, Scalar, ShapeSchema,
    WritePosition,
};
pub use linkdb_engine::{
    BatchPatchResult, CancelHandle, Database, DatabaseStats, FieldValues, IndexDefinition,
    IndexStats, IndexerStats, LinkDbConfig, LinkIds, MapFunction, MapIndex, MapSpec,
    QueryConsistency, Session, CONFIG_FILE_NAME,
};
pub use linkdb_script::{compile, Bindings, BoundScript, Script, ScriptParseError};
pub use linkdb_storage::{DurabilityMode, PatchStatus};

/// Serializable command interface for SDKs and transports.
pub mod command {
    pub use linkdb_executor::{
        BatchPatchSummary, Command, DocumentView, Error, Executor, KeyPatchResult, Output, Result,
        Session, StatsView,
    };
}
