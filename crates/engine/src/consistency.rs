//! Read-your-writes consistency
//!
//! Two clocks run independently: the store's write position and each index's
//! `indexed_through`. A session remembers the highest position its own writes
//! produced; before a query in `ReadYourWrites` mode it waits until the index
//! has caught up to that position.
//!
//! The wait sleeps on the indexer's [`Watermark`] condition variable, which is
//! signalled after every applied batch. It ends on success, on timeout
//! (`IndexStaleTimeout`), or when the session's [`CancelHandle`] fires
//! (`Cancelled`).

use crate::index::MapIndex;
use linkdb_core::{Error, Result, WritePosition};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// How fresh index reads must be for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryConsistency {
    /// Wait until the index reflects the session's own writes
    #[default]
    ReadYourWrites,
    /// Read whatever the index holds right now
    StaleOk,
}

impl QueryConsistency {
    /// Name as written in `linkdb.toml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryConsistency::ReadYourWrites => "read_your_writes",
            QueryConsistency::StaleOk => "stale_ok",
        }
    }
}

impl FromStr for QueryConsistency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read_your_writes" => Ok(QueryConsistency::ReadYourWrites),
            "stale_ok" => Ok(QueryConsistency::StaleOk),
            other => Err(Error::Config(format!(
                "invalid query consistency '{}', expected \"read_your_writes\" or \"stale_ok\"",
                other
            ))),
        }
    }
}

/// Position the indexer has applied through, with a condition variable
/// notified on every advance.
#[derive(Debug, Default)]
pub struct Watermark {
    applied: Mutex<WritePosition>,
    advanced: Condvar,
    closed: AtomicBool,
}

impl Watermark {
    /// Watermark starting at `position`.
    pub fn new(position: WritePosition) -> Self {
        Watermark {
            applied: Mutex::new(position),
            advanced: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Current value.
    pub fn get(&self) -> WritePosition {
        *self.applied.lock()
    }

    /// Move forward to `position` and wake every waiter. Never moves back.
    pub fn advance(&self, position: WritePosition) {
        let mut applied = self.applied.lock();
        if position > *applied {
            *applied = position;
        }
        self.advanced.notify_all();
    }

    /// Wake every waiter without advancing, so they re-check their exit
    /// conditions.
    pub fn wake_all(&self) {
        let _applied = self.applied.lock();
        self.advanced.notify_all();
    }

    /// Stop every current and later wait that has not reached its position.
    pub fn close(&self) {
        let _applied = self.applied.lock();
        self.closed.store(true, Ordering::Release);
        self.advanced.notify_all();
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Block until the watermark reaches `target`, the watermark closes, or
    /// `timeout` passes. Returns whether `target` was reached.
    pub fn wait_for(&self, target: WritePosition, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut applied = self.applied.lock();
        while *applied < target {
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            if self.advanced.wait_until(&mut applied, deadline).timed_out() {
                return *applied >= target;
            }
        }
        true
    }

    /// Block until `reached()` holds, `cancelled` is set, or `timeout` passes.
    ///
    /// `reached` is evaluated with the watermark lock held; whoever makes it
    /// true must call [`advance`](Self::advance) or
    /// [`wake_all`](Self::wake_all) afterwards.
    fn wait_until(
        &self,
        timeout: Duration,
        cancelled: &AtomicBool,
        mut reached: impl FnMut() -> bool,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut applied = self.applied.lock();
        loop {
            if reached() {
                return WaitOutcome::Reached;
            }
            if cancelled.load(Ordering::Acquire) {
                return WaitOutcome::Cancelled;
            }
            if self.closed.load(Ordering::Acquire) {
                return WaitOutcome::Closed;
            }
            if self.advanced.wait_until(&mut applied, deadline).timed_out() {
                return if reached() {
                    WaitOutcome::Reached
                } else {
                    WaitOutcome::TimedOut
                };
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Reached,
    TimedOut,
    Cancelled,
    Closed,
}

/// Cancels the blocking waits of one session.
///
/// Cloneable and `Send`, so another thread can abort a wait in progress.
/// Cancellation is sticky until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    watermark: Arc<Watermark>,
}

impl CancelHandle {
    pub(crate) fn new(watermark: Arc<Watermark>) -> Self {
        CancelHandle {
            flag: Arc::new(AtomicBool::new(false)),
            watermark,
        }
    }

    /// Abort the current and any later wait.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
        self.watermark.wake_all();
    }

    /// Whether [`cancel`](Self::cancel) was called since the last reset.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Allow waits again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub(crate) fn flag(&self) -> &AtomicBool {
        &self.flag
    }
}

/// Block until `index` reflects every write up to `required`.
///
/// Returns immediately when nothing is required or the index is already
/// there. Fails with `IndexStaleTimeout` after `timeout`, `Cancelled` if
/// `cancel` fires first, or `Closed` once the indexer has stopped.
pub fn wait_for_read_your_writes(
    index: &MapIndex,
    watermark: &Watermark,
    required: WritePosition,
    timeout: Duration,
    cancel: &CancelHandle,
) -> Result<()> {
    if index.indexed_through() >= required {
        return Ok(());
    }

    let started = Instant::now();
    debug!(
        index = index.name(),
        required = required.as_u64(),
        indexed_through = index.indexed_through().as_u64(),
        "waiting for index to catch up"
    );
    match watermark.wait_until(timeout, cancel.flag(), || {
        index.indexed_through() >= required
    }) {
        WaitOutcome::Reached => Ok(()),
        WaitOutcome::Cancelled => Err(Error::Cancelled),
        WaitOutcome::Closed => Err(Error::Closed),
        WaitOutcome::TimedOut => Err(Error::IndexStaleTimeout {
            index: index.name().to_string(),
            required: required.as_u64(),
            reached: index.indexed_through().as_u64(),
            waited_ms: started.elapsed().as_millis() as u64,
        }),
    }
}
