//! The Executor - single entry point to LinkDB's engine.
//!
//! The Executor is a stateless dispatcher that routes commands to engine
//! operations and converts results to outputs.

use std::sync::Arc;

use linkdb_core::{DocKey, Document};
use linkdb_engine::{BatchPatchResult, Database, Session as EngineSession};
use linkdb_script::Script;
use tracing::debug;

use crate::convert::convert_result;
use crate::output::{BatchPatchSummary, DocumentView, KeyPatchResult, StatsView};
use crate::{Command, Error, Output, Result};

/// The command executor.
///
/// The Executor is **stateless**: it holds a reference to the database but
/// keeps no session state of its own. [`Executor::execute`] runs each
/// command in a fresh engine session, so read-your-writes only spans a
/// single command. Use [`crate::Session`] to carry it across commands.
///
/// # Thread Safety
///
/// Executor is `Send + Sync` and can be shared across threads.
///
/// # Example
///
/// ```ignore
/// use linkdb_executor::{Command, Executor};
///
/// let executor = Executor::new(db);
/// executor.execute(Command::Put {
///     key: "ContactSpheres-1".into(),
///     collection: "ContactSpheres".into(),
///     body: serde_json::json!({"Acl": []}),
/// })?;
/// ```
#[derive(Clone)]
pub struct Executor {
    db: Arc<Database>,
}

impl Executor {
    /// Create a new executor wrapping a database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The wrapped database.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Execute a single command.
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        let mut session = self.db.session();
        self.execute_in(&mut session, cmd)
    }

    /// Execute commands in order, sharing one engine session.
    ///
    /// Later index reads observe earlier writes of the same batch. A failure
    /// does not stop the batch.
    pub fn execute_many(&self, cmds: Vec<Command>) -> Vec<Result<Output>> {
        let mut session = self.db.session();
        cmds.into_iter()
            .map(|cmd| self.execute_in(&mut session, cmd))
            .collect()
    }

    /// Execute a command within an existing engine session.
    pub fn execute_in(&self, session: &mut EngineSession, cmd: Command) -> Result<Output> {
        debug!(command = cmd.name(), "execute");
        match cmd {
            // Document commands
            Command::Put {
                key,
                collection,
                body,
            } => {
                let position =
                    convert_result(session.put(DocKey::new(key), Document::new(collection, body)))?;
                Ok(Output::Position(position.as_u64()))
            }
            Command::Get { key } => {
                let key = DocKey::new(key);
                let doc = convert_result(session.get(&key))?;
                Ok(Output::Document(DocumentView {
                    key: key.as_str().to_string(),
                    collection: doc.collection().to_string(),
                    body: doc.into_body(),
                }))
            }
            Command::Delete { key } => {
                let position = convert_result(session.delete(&DocKey::new(key)))?;
                Ok(Output::Position(position.as_u64()))
            }

            // Patch commands
            Command::Patch {
                key,
                script,
                bindings,
            } => {
                let script = Script::parse(&script)?;
                let status = convert_result(session.patch(&DocKey::new(key), &script, &bindings))?;
                Ok(Output::Patch(status))
            }
            Command::PatchByIndex {
                index,
                query,
                script,
                bindings,
            } => {
                let script = Script::parse(&script)?;
                let result =
                    convert_result(session.patch_by_index(&index, &query, &script, &bindings))?;
                Ok(Output::BatchPatch(summarize(result)))
            }

            // Index commands
            Command::CreateIndex { definition } => {
                convert_result(self.db.create_index(&definition))?;
                Ok(Output::Unit)
            }
            Command::Query { index, value } => {
                let keys = convert_result(session.query(&index, &value))?;
                Ok(Output::Keys(
                    keys.into_iter().map(|k| k.as_str().to_string()).collect(),
                ))
            }

            // Session commands
            Command::SetConsistency { consistency } => {
                session.set_consistency(consistency);
                Ok(Output::Unit)
            }

            // Database commands
            Command::Ping => Ok(Output::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            Command::Stats => {
                let stats = self.db.stats();
                Ok(Output::Stats(StatsView {
                    documents: stats.documents,
                    position: stats.position.as_u64(),
                    indexed_through: stats.indexer.applied_through.as_u64(),
                    pending_changes: stats.indexer.pending,
                    indexes: self.db.index_names(),
                    durability: stats.durability.as_str().to_string(),
                }))
            }
            Command::Flush => {
                convert_result(self.db.flush())?;
                Ok(Output::Unit)
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

fn summarize(result: BatchPatchResult) -> BatchPatchSummary {
    let patched = result.patched();
    let failed = result.failed();
    let results = result
        .results
        .into_iter()
        .map(|(key, outcome)| {
            let key = key.as_str().to_string();
            match outcome {
                Ok(status) => KeyPatchResult {
                    key,
                    status: Some(status),
                    error: None,
                },
                Err(e) => KeyPatchResult {
                    key,
                    status: None,
                    error: Some(Error::from(e)),
                },
            }
        })
        .collect();
    BatchPatchSummary {
        index: result.index,
        query: result.query,
        matched: result.matched,
        patched,
        failed,
        results,
    }
}
