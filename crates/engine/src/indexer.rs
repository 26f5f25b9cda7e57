//! Background indexer
//!
//! One worker thread, `linkdb-indexer`, drains the store's change feed in
//! commit order and applies every change to every registered index. After
//! each batch it advances the indexes and the shared [`Watermark`], waking
//! read-your-writes waiters.
//!
//! New indexes are backfilled from a store scan while the registry is locked
//! for writing, so no batch is applied half before and half after the index
//! joins.

use crate::consistency::Watermark;
use crate::index::{panic_message, IndexDefinition, MapFunction, MapIndex};
use linkdb_core::{Error, Result, WritePosition};
use linkdb_storage::{Change, ChangeFeed, DocumentStore};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

/// How long the worker sleeps on an empty feed before re-checking.
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Registry {
    indexes: FxHashMap<String, Arc<MapIndex>>,
}

struct IndexerShared {
    registry: RwLock<Registry>,
    watermark: Arc<Watermark>,
    batches_applied: AtomicU64,
    changes_applied: AtomicU64,
}

impl IndexerShared {
    fn apply_batch(&self, batch: &[Change]) {
        let Some(last) = batch.last().map(|c| c.position) else {
            return;
        };
        let registry = self.registry.write();
        for index in registry.indexes.values() {
            for change in batch {
                index.apply(change);
            }
        }
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        self.changes_applied
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
        self.mark_applied(&registry, last);
    }

    /// Advance every index, then the watermark, to `last`.
    ///
    /// Called with the registry held so a concurrent define reads a
    /// watermark that matches the index contents.
    fn mark_applied(&self, registry: &Registry, last: WritePosition) {
        for index in registry.indexes.values() {
            index.advance_to(last);
        }
        self.watermark.advance(last);
    }
}

/// Counters describing the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerStats {
    /// Registered indexes
    pub indexes: usize,
    /// Position every index reflects
    pub applied_through: WritePosition,
    /// Changes waiting in the feed
    pub pending: usize,
    /// Batches applied since start
    pub batches_applied: u64,
    /// Changes applied since start
    pub changes_applied: u64,
    /// Whether the feed is paused
    pub paused: bool,
}

/// Owner of the map indexes and the thread that maintains them.
pub struct Indexer {
    shared: Arc<IndexerShared>,
    feed: Arc<ChangeFeed>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Indexer {
    /// Start indexing `store`'s change feed.
    ///
    /// Everything already committed counts as indexed: there are no indexes
    /// yet, and each new one is backfilled from the store.
    pub fn start(store: &DocumentStore, batch_size: usize) -> Result<Self> {
        let feed = store.feed();
        let shared = Arc::new(IndexerShared {
            registry: RwLock::new(Registry::default()),
            watermark: Arc::new(Watermark::new(store.current_position())),
            batches_applied: AtomicU64::new(0),
            changes_applied: AtomicU64::new(0),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            let feed = Arc::clone(&feed);
            std::thread::Builder::new()
                .name("linkdb-indexer".to_string())
                .spawn(move || indexer_loop(&shared, &feed, batch_size))?
        };

        Ok(Indexer {
            shared,
            feed,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Register a built-in index described by `definition` and backfill it.
    pub fn create_index(&self, store: &DocumentStore, definition: &IndexDefinition) -> Result<()> {
        definition.validate()?;
        self.define(
            store,
            &definition.name,
            definition.collections.clone(),
            definition.map.build(),
        )
    }

    /// Register an index with a custom map function and backfill it.
    pub fn define(
        &self,
        store: &DocumentStore,
        name: &str,
        collections: Vec<String>,
        map: Arc<dyn MapFunction>,
    ) -> Result<()> {
        let mut registry = self.shared.registry.write();
        if registry.indexes.contains_key(name) {
            return Err(Error::IndexExists {
                name: name.to_string(),
            });
        }

        let index = Arc::new(MapIndex::new(name, collections, map));
        let applied = self.shared.watermark.get();
        let mut scanned = 0usize;
        for collection in index.collections() {
            let documents = store.scan(Some(collection));
            scanned += documents.len();
            index.backfill(&documents);
        }
        index.advance_to(applied);
        registry.indexes.insert(name.to_string(), Arc::clone(&index));

        info!(
            index = name,
            collections = ?index.collections(),
            documents = scanned,
            indexed_through = applied.as_u64(),
            "defined index"
        );
        Ok(())
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Result<Arc<MapIndex>> {
        self.shared
            .registry
            .read()
            .indexes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::IndexNotFound {
                name: name.to_string(),
            })
    }

    /// Names of all indexes, sorted.
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.registry.read().indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// The watermark waiters sleep on.
    pub fn watermark(&self) -> Arc<Watermark> {
        Arc::clone(&self.shared.watermark)
    }

    /// Position every index reflects.
    pub fn applied_through(&self) -> WritePosition {
        self.shared.watermark.get()
    }

    /// Stop applying changes. Commits keep queueing in the feed.
    pub fn pause(&self) {
        debug!("indexer paused");
        self.feed.pause();
    }

    /// Resume applying changes.
    pub fn resume(&self) {
        debug!("indexer resumed");
        self.feed.resume();
    }

    /// Counters.
    pub fn stats(&self) -> IndexerStats {
        IndexerStats {
            indexes: self.shared.registry.read().indexes.len(),
            applied_through: self.applied_through(),
            pending: self.feed.len(),
            batches_applied: self.shared.batches_applied.load(Ordering::Relaxed),
            changes_applied: self.shared.changes_applied.load(Ordering::Relaxed),
            paused: self.feed.is_paused(),
        }
    }

    /// Stop the worker thread and wait for it. Idempotent.
    pub fn shutdown(&self) {
        self.feed.close();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("indexer thread terminated by panic");
            }
        }
        // Release anyone still waiting on a position that will never come
        self.shared.watermark.close();
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer").field("stats", &self.stats()).finish()
    }
}

fn indexer_loop(shared: &IndexerShared, feed: &ChangeFeed, batch_size: usize) {
    while let Some(batch) = feed.next_batch(batch_size, IDLE_POLL) {
        if batch.is_empty() {
            continue;
        }
        // Map panics are caught per document inside the index; this only
        // guards the worker against anything else. The batch still counts as
        // applied for every index so waiters are released.
        if let Err(e) =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| shared.apply_batch(&batch)))
        {
            error!(panic = panic_message(e.as_ref()), "indexer batch panicked");
            if let Some(last) = batch.last() {
                shared.mark_applied(&shared.registry.write(), last.position);
            }
        }
    }
    debug!("indexer stopped");
}
