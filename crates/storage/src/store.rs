//! Sharded document store
//!
//! # Design
//!
//! - DashMap: documents sharded by key, lock-free reads of other shards
//! - One commit lock: allocates the write position, appends the WAL record
//!   and pushes the change feed, so all three agree on commit order
//! - Per-key serialization: every write holds the key's DashMap entry for
//!   its whole read-modify-write, including script execution for patches
//!
//! Lock order is always shard entry, then commit lock, then feed. Nothing
//! acquires a shard while holding the commit lock.

use crate::feed::{Change, ChangeFeed, ChangeKind};
use crate::wal::{DurabilityMode, Wal, WalRecord};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linkdb_core::{
    validate_document, DocKey, Document, Error, Result, ShapeSchema, WritePosition,
};
use linkdb_script::{Bindings, BoundScript, Script};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of patching one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchStatus {
    /// The script changed the document; committed at this position
    Patched(WritePosition),
    /// The script ran but left the document identical; nothing committed
    NotModified,
    /// No document under the key; the patch is a successful no-op
    DocumentDoesNotExist,
}

impl PatchStatus {
    /// True when a new version was committed.
    pub fn is_patched(&self) -> bool {
        matches!(self, PatchStatus::Patched(_))
    }

    /// Commit position, when one was made.
    pub fn position(&self) -> Option<WritePosition> {
        match self {
            PatchStatus::Patched(p) => Some(*p),
            _ => None,
        }
    }
}

/// A live document and the position of its last commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Current state
    pub document: Document,
    /// Position of the commit that produced it
    pub position: WritePosition,
}

struct CommitLog {
    position: WritePosition,
    wal: Option<Wal>,
}

/// Keyed document storage with an ordered change feed.
pub struct DocumentStore {
    documents: DashMap<DocKey, StoredDocument>,
    shapes: DashMap<String, ShapeSchema>,
    commit: Mutex<CommitLog>,
    /// Mirror of the last committed position for lock-free reads
    position: AtomicU64,
    feed: Arc<ChangeFeed>,
    mode: DurabilityMode,
}

impl DocumentStore {
    /// Store without a WAL. All data is lost on drop.
    pub fn in_memory() -> Self {
        Self::build(DashMap::new(), WritePosition::ZERO, None, DurabilityMode::InMemory)
    }

    /// Open a store in `dir`, replaying its WAL.
    ///
    /// `DurabilityMode::InMemory` ignores `dir` and behaves like
    /// [`DocumentStore::in_memory`].
    pub fn open(dir: &Path, mode: DurabilityMode) -> Result<Self> {
        if !mode.requires_wal() {
            return Ok(Self::in_memory());
        }

        let (wal, records) = Wal::open(dir, mode)?;
        let documents = DashMap::new();
        let mut position = WritePosition::ZERO;
        for record in records {
            if record.position() <= position {
                return Err(Error::Corruption(format!(
                    "WAL position {} does not follow {}",
                    record.position(),
                    position
                )));
            }
            position = record.position();
            match record {
                WalRecord::Put {
                    position,
                    key,
                    document,
                } => {
                    documents.insert(key, StoredDocument { document, position });
                }
                WalRecord::Delete { key, .. } => {
                    documents.remove(&key);
                }
            }
        }

        info!(
            dir = %dir.display(),
            documents = documents.len(),
            position = position.as_u64(),
            "recovered document store"
        );
        Ok(Self::build(documents, position, Some(wal), mode))
    }

    fn build(
        documents: DashMap<DocKey, StoredDocument>,
        position: WritePosition,
        wal: Option<Wal>,
        mode: DurabilityMode,
    ) -> Self {
        Self {
            documents,
            shapes: DashMap::new(),
            commit: Mutex::new(CommitLog { position, wal }),
            position: AtomicU64::new(position.as_u64()),
            feed: Arc::new(ChangeFeed::new()),
            mode,
        }
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// Register (or replace) the schema of a collection. Applies to later
    /// writes only.
    pub fn register_shape(&self, schema: ShapeSchema) {
        debug!(collection = %schema.collection, "registered shape");
        self.shapes.insert(schema.collection.clone(), schema);
    }

    /// Schema registered for `collection`.
    pub fn shape(&self, collection: &str) -> Option<ShapeSchema> {
        self.shapes.get(collection).map(|s| s.value().clone())
    }

    fn validate(&self, key: &DocKey, doc: &Document) -> Result<()> {
        let schema = self.shape(doc.collection());
        validate_document(key, doc, schema.as_ref())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current state of `key`.
    pub fn get(&self, key: &DocKey) -> Result<Document> {
        self.documents
            .get(key)
            .map(|entry| entry.document.clone())
            .ok_or_else(|| Error::not_found(key.as_str()))
    }

    /// Current state of `key` with its commit position.
    pub fn get_stored(&self, key: &DocKey) -> Option<StoredDocument> {
        self.documents.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` holds a document.
    pub fn contains(&self, key: &DocKey) -> bool {
        self.documents.contains_key(key)
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Position of the last commit.
    pub fn current_position(&self) -> WritePosition {
        WritePosition::new(self.position.load(Ordering::Acquire))
    }

    /// Snapshot of live documents, optionally limited to one collection,
    /// sorted by key.
    ///
    /// Each entry is read under its shard lock, so it reflects a committed
    /// state; the snapshot as a whole is not taken at a single position.
    pub fn scan(&self, collection: Option<&str>) -> Vec<(DocKey, StoredDocument)> {
        let mut out: Vec<(DocKey, StoredDocument)> = self
            .documents
            .iter()
            .filter(|entry| collection.map_or(true, |c| entry.document.collection() == c))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create or replace the document under `key`.
    pub fn put(&self, key: DocKey, document: Document) -> Result<WritePosition> {
        self.validate(&key, &document)?;
        let entry = self.documents.entry(key.clone());
        let position = self.commit_change(&key, ChangeKind::Put(document.clone()))?;
        let stored = StoredDocument { document, position };
        match entry {
            Entry::Occupied(mut o) => {
                o.insert(stored);
            }
            Entry::Vacant(v) => {
                v.insert(stored);
            }
        }
        Ok(position)
    }

    /// Remove the document under `key`.
    pub fn delete(&self, key: &DocKey) -> Result<WritePosition> {
        match self.documents.entry(key.clone()) {
            Entry::Occupied(o) => {
                let position = self.commit_change(key, ChangeKind::Delete)?;
                o.remove();
                Ok(position)
            }
            Entry::Vacant(_) => Err(Error::not_found(key.as_str())),
        }
    }

    /// Bind `script` and run it against `key`.
    ///
    /// Binding happens first, so an unbound parameter fails even when the
    /// document does not exist.
    pub fn apply_patch(
        &self,
        key: &DocKey,
        script: &Script,
        bindings: &Bindings,
    ) -> Result<PatchStatus> {
        let bound = script.bind(bindings)?;
        self.apply_bound(key, &bound)
    }

    /// Run an already bound script against `key`.
    ///
    /// The script runs on a copy. Only a successful run that changed the
    /// document is validated and committed; any error leaves the stored
    /// document untouched.
    pub fn apply_bound(&self, key: &DocKey, script: &BoundScript) -> Result<PatchStatus> {
        let mut occupied = match self.documents.entry(key.clone()) {
            Entry::Occupied(o) => o,
            Entry::Vacant(_) => return Ok(PatchStatus::DocumentDoesNotExist),
        };

        let current = &occupied.get().document;
        let patched = script.run(key, current)?;
        if &patched == current {
            return Ok(PatchStatus::NotModified);
        }
        self.validate(key, &patched)?;

        let position = self.commit_change(key, ChangeKind::Put(patched.clone()))?;
        occupied.insert(StoredDocument {
            document: patched,
            position,
        });
        Ok(PatchStatus::Patched(position))
    }

    /// Allocate the next position, log the change and publish it.
    ///
    /// The caller holds the key's shard entry and applies the change to the
    /// map right after this returns, before releasing the entry.
    fn commit_change(&self, key: &DocKey, kind: ChangeKind) -> Result<WritePosition> {
        let mut log = self.commit.lock();
        let position = log.position.next();

        if let Some(wal) = log.wal.as_mut() {
            let record = match &kind {
                ChangeKind::Put(document) => WalRecord::Put {
                    position,
                    key: key.clone(),
                    document: document.clone(),
                },
                ChangeKind::Delete => WalRecord::Delete {
                    position,
                    key: key.clone(),
                },
            };
            wal.append(&record)?;
        }

        log.position = position;
        self.position.store(position.as_u64(), Ordering::Release);
        self.feed.push(Change {
            position,
            key: key.clone(),
            kind,
        });
        Ok(position)
    }

    // ========================================================================
    // Durability and plumbing
    // ========================================================================

    /// Fsync the WAL. No-op in memory.
    pub fn flush(&self) -> Result<()> {
        let mut log = self.commit.lock();
        if let Some(wal) = log.wal.as_mut() {
            wal.sync()?;
        }
        Ok(())
    }

    /// Durability mode the store was opened with.
    pub fn durability(&self) -> DurabilityMode {
        self.mode
    }

    /// The feed every commit is published to.
    pub fn feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("documents", &self.documents.len())
            .field("position", &self.current_position())
            .field("durability", &self.mode)
            .finish()
    }
}
