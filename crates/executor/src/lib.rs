//! # LinkDB Executor
//!
//! The command interface of LinkDB.
//!
//! Every operation a client can request is a serializable [`Command`]; every
//! result is an [`Output`] or a serializable [`Error`]. SDKs and transports
//! exchange these as JSON and never touch engine types.
//!
//! ## Quick Start
//!
//! ```text
//! use linkdb_executor::{Command, Session};
//!
//! let db = linkdb_engine::Database::open("/path/to/data")?;
//! let mut session = Session::new(db);
//!
//! session.execute(Command::PatchByIndex {
//!     index: "ScopeIndex".into(),
//!     query: "ContactSpheres-1".into(),
//!     script: "this.Spheres.map(l => if l.Id == sphereId { l.Acl.push(friend) })".into(),
//!     bindings: Bindings::new().with("sphereId", "ContactSpheres-1").with("friend", "users/1"),
//! })?;
//! ```
//!
//! ## Stateless vs stateful
//!
//! | Type | Read-your-writes spans |
//! |------|------------------------|
//! | [`Executor::execute`] | one command |
//! | [`Executor::execute_many`] | one batch |
//! | [`Session::execute`] | the session's lifetime |

#![warn(missing_docs)]

mod command;
mod convert;
mod error;
mod executor;
mod output;
mod session;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use command::Command;
pub use error::{Error, Result};
pub use executor::Executor;
pub use output::{BatchPatchSummary, DocumentView, KeyPatchResult, Output, StatsView};
pub use session::Session;

// Re-exported so command builders need no direct engine imports
pub use linkdb_core::Scalar;
pub use linkdb_engine::{IndexDefinition, MapSpec, QueryConsistency};
pub use linkdb_script::Bindings;
pub use linkdb_storage::PatchStatus;
