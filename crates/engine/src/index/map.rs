//! A single map index
//!
//! Entries are kept as `term -> keys`, alongside each document's current
//! contribution `key -> (position, terms)`. A change replaces the whole
//! contribution of its key, and only when it is newer than the one held, so
//! replays and backfill races can never move a key back to an older state.

use super::MapFunction;
use linkdb_core::{DocKey, Document, IndexTerm, Scalar, WritePosition};
use linkdb_storage::{Change, ChangeKind, StoredDocument};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Text of a panic payload from `panic!("literal")` or `panic!("{}", x)`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

#[derive(Debug)]
struct Contribution {
    position: WritePosition,
    terms: FxHashSet<IndexTerm>,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: FxHashMap<IndexTerm, BTreeSet<DocKey>>,
    contributions: FxHashMap<DocKey, Contribution>,
}

impl IndexState {
    fn is_newer(&self, key: &DocKey, position: WritePosition) -> bool {
        self.contributions
            .get(key)
            .map_or(true, |c| c.position < position)
    }

    fn remove_contribution(&mut self, key: &DocKey) {
        if let Some(old) = self.contributions.remove(key) {
            for term in old.terms {
                if let Some(keys) = self.entries.get_mut(&term) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.entries.remove(&term);
                    }
                }
            }
        }
    }

    fn replace(&mut self, key: &DocKey, position: WritePosition, terms: FxHashSet<IndexTerm>) {
        self.remove_contribution(key);
        for term in &terms {
            self.entries
                .entry(term.clone())
                .or_default()
                .insert(key.clone());
        }
        self.contributions
            .insert(key.clone(), Contribution { position, terms });
    }
}

/// Counters describing one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Distinct indexed values
    pub terms: usize,
    /// Documents currently contributing entries
    pub documents: usize,
    /// Position the index reflects
    pub indexed_through: WritePosition,
}

/// Secondary index `value -> document keys`, fed asynchronously.
pub struct MapIndex {
    name: String,
    collections: Vec<String>,
    map: Arc<dyn MapFunction>,
    state: RwLock<IndexState>,
    indexed_through: AtomicU64,
}

impl MapIndex {
    /// Empty index.
    pub fn new(
        name: impl Into<String>,
        collections: Vec<String>,
        map: Arc<dyn MapFunction>,
    ) -> Self {
        MapIndex {
            name: name.into(),
            collections,
            map,
            state: RwLock::new(IndexState::default()),
            indexed_through: AtomicU64::new(0),
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source collections.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    fn covers(&self, collection: &str) -> bool {
        self.collections.iter().any(|c| c == collection)
    }

    /// Every commit up to this position is reflected in query results.
    pub fn indexed_through(&self) -> WritePosition {
        WritePosition::new(self.indexed_through.load(Ordering::Acquire))
    }

    pub(crate) fn advance_to(&self, position: WritePosition) {
        self.indexed_through
            .fetch_max(position.as_u64(), Ordering::AcqRel);
    }

    /// Keys of the documents indexed under `value`, sorted.
    pub fn query(&self, value: &Scalar) -> Vec<DocKey> {
        let term = value.index_term();
        self.state
            .read()
            .entries
            .get(&term)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Current counters.
    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            terms: state.entries.len(),
            documents: state.contributions.len(),
            indexed_through: self.indexed_through(),
        }
    }

    /// Terms for `doc`, or `None` if it does not map cleanly. A panicking
    /// map function counts as not mapping.
    fn terms_for(&self, key: &DocKey, doc: &Document) -> Option<FxHashSet<IndexTerm>> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.map.map(doc))) {
            Ok(Ok(values)) => Some(values.iter().map(Scalar::index_term).collect()),
            Ok(Err(e)) => {
                warn!(
                    index = %self.name,
                    key = %key,
                    error = %e,
                    "document does not map, skipping"
                );
                None
            }
            Err(payload) => {
                warn!(
                    index = %self.name,
                    key = %key,
                    panic = panic_message(payload.as_ref()),
                    "map function panicked, skipping"
                );
                None
            }
        }
    }

    /// Apply one committed change. Does not advance `indexed_through`.
    pub(crate) fn apply(&self, change: &Change) {
        let mut state = self.state.write();
        if !state.is_newer(&change.key, change.position) {
            return;
        }
        match &change.kind {
            ChangeKind::Put(doc) if self.covers(doc.collection()) => {
                let terms = self.terms_for(&change.key, doc).unwrap_or_default();
                state.replace(&change.key, change.position, terms);
            }
            // Deleted, or moved to a collection this index does not cover
            _ => state.remove_contribution(&change.key),
        }
    }

    /// Load current documents from a store scan.
    pub(crate) fn backfill(&self, documents: &[(DocKey, StoredDocument)]) {
        let mut state = self.state.write();
        for (key, stored) in documents {
            if !self.covers(stored.document.collection())
                || !state.is_newer(key, stored.position)
            {
                continue;
            }
            let terms = self.terms_for(key, &stored.document).unwrap_or_default();
            state.replace(key, stored.position, terms);
        }
    }
}

impl std::fmt::Debug for MapIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapIndex")
            .field("name", &self.name)
            .field("collections", &self.collections)
            .field("map", &self.map)
            .field("indexed_through", &self.indexed_through())
            .finish()
    }
}
