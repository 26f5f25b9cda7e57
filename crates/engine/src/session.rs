//! Client sessions
//!
//! A session is the unit of read-your-writes: it records the highest write
//! position its own commits produced, and in `ReadYourWrites` mode every
//! index read first waits for the index to reach that position.

use crate::consistency::{wait_for_read_your_writes, CancelHandle, QueryConsistency};
use crate::database::Database;
use crate::index::MapIndex;
use crate::patch::{BatchPatchResult, PatchExecutor};
use linkdb_core::{DocKey, Document, Result, Scalar, WritePosition};
use linkdb_script::{Bindings, Script};
use linkdb_storage::PatchStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-client handle to a [`Database`].
///
/// `Send + Sync`; all operations take `&self`. Sessions are cheap, create
/// one per logical client.
pub struct Session {
    db: Arc<Database>,
    last_write: AtomicU64,
    consistency: QueryConsistency,
    wait_timeout: Duration,
    cancel: CancelHandle,
}

impl Session {
    pub(crate) fn new(
        db: Arc<Database>,
        consistency: QueryConsistency,
        wait_timeout: Duration,
    ) -> Self {
        let cancel = CancelHandle::new(db.indexer().watermark());
        Session {
            db,
            last_write: AtomicU64::new(0),
            consistency,
            wait_timeout,
            cancel,
        }
    }

    // ========================================================================
    // Consistency state
    // ========================================================================

    /// Highest position produced by this session's writes.
    pub fn last_write_position(&self) -> WritePosition {
        WritePosition::new(self.last_write.load(Ordering::Acquire))
    }

    fn observe(&self, position: WritePosition) {
        self.last_write
            .fetch_max(position.as_u64(), Ordering::AcqRel);
    }

    /// Consistency used by index reads.
    pub fn consistency(&self) -> QueryConsistency {
        self.consistency
    }

    /// Change the consistency of later index reads.
    pub fn set_consistency(&mut self, consistency: QueryConsistency) {
        self.consistency = consistency;
    }

    /// Bound on each read-your-writes wait.
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Change the read-your-writes wait bound.
    pub fn set_wait_timeout(&mut self, timeout: Duration) {
        self.wait_timeout = timeout;
    }

    /// Handle that aborts this session's waits from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The database this session talks to.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Create or replace a document.
    pub fn put(&self, key: DocKey, document: Document) -> Result<WritePosition> {
        self.db.ensure_open()?;
        let position = self.db.store().put(key, document)?;
        self.observe(position);
        Ok(position)
    }

    /// Read a document.
    pub fn get(&self, key: &DocKey) -> Result<Document> {
        self.db.store().get(key)
    }

    /// Delete a document.
    pub fn delete(&self, key: &DocKey) -> Result<WritePosition> {
        self.db.ensure_open()?;
        let position = self.db.store().delete(key)?;
        self.observe(position);
        Ok(position)
    }

    /// Patch one document by key. A missing key is a successful no-op.
    pub fn patch(
        &self,
        key: &DocKey,
        script: &Script,
        bindings: &Bindings,
    ) -> Result<PatchStatus> {
        self.db.ensure_open()?;
        let status = PatchExecutor::new(self.db.store()).patch_by_key(key, script, bindings)?;
        if let Some(position) = status.position() {
            self.observe(position);
        }
        Ok(status)
    }

    // ========================================================================
    // Index reads
    // ========================================================================

    /// Wait until `index` reflects this session's writes.
    pub fn wait_for_read_your_writes(&self, index: &MapIndex) -> Result<()> {
        wait_for_read_your_writes(
            index,
            &self.db.indexer().watermark(),
            self.last_write_position(),
            self.wait_timeout,
            &self.cancel,
        )
    }

    fn fresh_index(&self, name: &str) -> Result<Arc<MapIndex>> {
        let index = self.db.index(name)?;
        if self.consistency == QueryConsistency::ReadYourWrites {
            self.wait_for_read_your_writes(&index)?;
        }
        Ok(index)
    }

    /// Keys indexed under `value`, honouring the session's consistency.
    pub fn query(&self, index: &str, value: &Scalar) -> Result<Vec<DocKey>> {
        Ok(self.fresh_index(index)?.query(value))
    }

    /// Patch every document `index` resolves `value` to.
    ///
    /// The script is bound once up front; an unbound parameter fails the
    /// whole call before anything is touched. Per-document failures are
    /// reported in the result.
    pub fn patch_by_index(
        &self,
        index: &str,
        value: &Scalar,
        script: &Script,
        bindings: &Bindings,
    ) -> Result<BatchPatchResult> {
        self.db.ensure_open()?;
        let bound = script.bind(bindings)?;
        let index = self.fresh_index(index)?;
        let result = PatchExecutor::new(self.db.store()).patch_resolved(&index, value, &bound);
        if let Some(max) = result
            .results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok().and_then(PatchStatus::position))
            .max()
        {
            self.observe(max);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("last_write", &self.last_write_position())
            .field("consistency", &self.consistency)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}
