//! Ordered change feed
//!
//! Every commit of the [`DocumentStore`](crate::DocumentStore) pushes one
//! [`Change`] while the commit lock is held, so the queue is always in
//! strictly increasing position order. The indexer is the only consumer.
//!
//! The feed can be paused. A paused feed keeps accepting changes but hands
//! none out, which is how a slow indexer is simulated.

use linkdb_core::{DocKey, Document, WritePosition};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// What a commit did to its key.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Document created or replaced; carries the new state
    Put(Document),
    /// Document removed
    Delete,
}

/// One committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Commit position
    pub position: WritePosition,
    /// Affected key
    pub key: DocKey,
    /// New state
    pub kind: ChangeKind,
}

impl Change {
    /// Collection of the new document, `None` for deletes.
    pub fn collection(&self) -> Option<&str> {
        match &self.kind {
            ChangeKind::Put(doc) => Some(doc.collection()),
            ChangeKind::Delete => None,
        }
    }
}

#[derive(Default)]
struct FeedState {
    queue: VecDeque<Change>,
    paused: bool,
    closed: bool,
}

/// Multi-producer, single-consumer queue of committed changes.
#[derive(Default)]
pub struct ChangeFeed {
    state: Mutex<FeedState>,
    ready: Condvar,
}

impl ChangeFeed {
    /// Create an empty, running feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change. Callers must push in position order.
    pub fn push(&self, change: Change) {
        let mut state = self.state.lock();
        debug_assert!(
            state
                .queue
                .back()
                .map_or(true, |last| last.position < change.position),
            "change feed must stay in position order"
        );
        state.queue.push_back(change);
        if !state.paused {
            self.ready.notify_one();
        }
    }

    /// Block until changes are available and hand out up to `max` of them.
    ///
    /// Returns `None` once the feed is closed. `timeout` bounds each wait so
    /// the consumer can re-check external state; an expired wait with nothing
    /// to hand out returns `Some(vec![])`.
    pub fn next_batch(&self, max: usize, timeout: Duration) -> Option<Vec<Change>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if !state.paused && !state.queue.is_empty() {
                let n = max.max(1).min(state.queue.len());
                return Some(state.queue.drain(..n).collect());
            }
            if self.ready.wait_for(&mut state, timeout).timed_out() {
                return Some(Vec::new());
            }
        }
    }

    /// Stop handing out changes until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Resume handing out changes.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        self.ready.notify_all();
    }

    /// Whether the feed is paused.
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Wake the consumer and make every later `next_batch` return `None`.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.ready.notify_all();
    }

    /// Changes waiting to be consumed.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChangeFeed")
            .field("pending", &state.queue.len())
            .field("paused", &state.paused)
            .field("closed", &state.closed)
            .finish()
    }
}
