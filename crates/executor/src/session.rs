//! Stateful session carrying read-your-writes across commands.
//!
//! The [`Session`] wraps an [`Executor`] and one engine session. Every write
//! it executes raises the session's write position; every later index read
//! through the same session waits for the index to catch up (unless the
//! session switched to `stale_ok`).
//!
//! # Usage
//!
//! ```ignore
//! use linkdb_executor::{Command, Session};
//!
//! let mut session = Session::new(db.clone());
//! session.execute(Command::Patch { .. })?;
//! // Sees the patch above, or fails with IndexStale
//! session.execute(Command::Query { index: "ScopeIndex".into(), value: "x".into() })?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use linkdb_engine::{CancelHandle, Database, QueryConsistency, Session as EngineSession};

use crate::{Command, Executor, Output, Result};

/// A stateful command session.
pub struct Session {
    executor: Executor,
    inner: EngineSession,
}

impl Session {
    /// Create a new session with the database's default consistency.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            inner: db.session(),
            executor: Executor::new(db),
        }
    }

    /// Execute a command in this session.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        self.executor.execute_in(&mut self.inner, cmd)
    }

    /// Get a reference to the underlying executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Highest position produced by this session's writes.
    pub fn last_write_position(&self) -> u64 {
        self.inner.last_write_position().as_u64()
    }

    /// Current consistency of index reads.
    pub fn consistency(&self) -> QueryConsistency {
        self.inner.consistency()
    }

    /// Change the read-your-writes wait bound.
    pub fn set_wait_timeout(&mut self, timeout: Duration) {
        self.inner.set_wait_timeout(timeout);
    }

    /// Handle that aborts this session's waits from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.inner.cancel_handle()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("inner", &self.inner).finish()
    }
}
