//! Database struct and open/close logic
//!
//! This module provides the main Database struct that orchestrates:
//! - Configuration loading (`linkdb.toml`)
//! - Store opening and WAL recovery
//! - The background indexer and its map indexes
//! - Sessions, which carry per-client consistency state
//!
//! Reads and writes go through a [`Session`] so the database can honour
//! read-your-writes for index queries.

pub mod config;

pub use config::{LinkDbConfig, CONFIG_FILE_NAME};

use crate::consistency::QueryConsistency;
use crate::index::{IndexDefinition, MapFunction, MapIndex};
use crate::indexer::{Indexer, IndexerStats};
use crate::session::Session;
use linkdb_core::{Error, Result, ShapeSchema, WritePosition};
use linkdb_storage::{DocumentStore, DurabilityMode};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Snapshot of database counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Live documents
    pub documents: usize,
    /// Last committed position
    pub position: WritePosition,
    /// Indexer state
    pub indexer: IndexerStats,
    /// Durability mode in use
    pub durability: DurabilityMode,
}

/// An open LinkDB database.
pub struct Database {
    store: DocumentStore,
    indexer: Indexer,
    config: LinkDbConfig,
    default_consistency: QueryConsistency,
    data_dir: Option<PathBuf>,
    open: AtomicBool,
}

impl Database {
    /// Open (or create) a database in `path`.
    ///
    /// Reads `linkdb.toml` from the directory, writing the default file
    /// first if there is none.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        LinkDbConfig::write_default_if_missing(&config_path)?;
        let cfg = LinkDbConfig::from_file(&config_path)?;

        Self::open_with_config(path, cfg)
    }

    /// Open a database in `path` with an explicit configuration.
    ///
    /// The configuration is written to `linkdb.toml` so that a later
    /// [`Database::open`] picks up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: LinkDbConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        cfg.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;

        let store = DocumentStore::open(&data_dir, cfg.durability_mode()?)?;
        let db = Self::assemble(store, cfg, Some(data_dir))?;
        info!(
            path = ?db.data_dir,
            documents = db.store.len(),
            position = db.store.current_position().as_u64(),
            durability = db.store.durability().as_str(),
            "opened database"
        );
        Ok(db)
    }

    /// Ephemeral database with default settings and no WAL.
    pub fn in_memory() -> Result<Arc<Self>> {
        Self::in_memory_with_config(LinkDbConfig::in_memory())
    }

    /// Ephemeral database. The durability setting of `cfg` is ignored.
    pub fn in_memory_with_config(cfg: LinkDbConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        Self::assemble(DocumentStore::in_memory(), cfg, None)
    }

    fn assemble(
        store: DocumentStore,
        config: LinkDbConfig,
        data_dir: Option<PathBuf>,
    ) -> Result<Arc<Self>> {
        let indexer = Indexer::start(&store, config.indexer_batch_size)?;
        Ok(Arc::new(Database {
            default_consistency: config.consistency()?,
            store,
            indexer,
            config,
            data_dir,
            open: AtomicBool::new(true),
        }))
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// New session with the configured default consistency and wait bound.
    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(
            Arc::clone(self),
            self.default_consistency,
            self.config.index_wait_timeout(),
        )
    }

    // ========================================================================
    // Schemas and indexes
    // ========================================================================

    /// Register the schema of a collection.
    pub fn register_shape(&self, schema: ShapeSchema) {
        self.store.register_shape(schema);
    }

    /// Create a built-in index and backfill it from existing documents.
    pub fn create_index(&self, definition: &IndexDefinition) -> Result<()> {
        self.ensure_open()?;
        self.indexer.create_index(&self.store, definition)
    }

    /// Create an index with a custom map function.
    pub fn define_index(
        &self,
        name: &str,
        collections: &[&str],
        map: Arc<dyn MapFunction>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.indexer.define(
            &self.store,
            name,
            collections.iter().map(|c| c.to_string()).collect(),
            map,
        )
    }

    /// Look up an index.
    pub fn index(&self, name: &str) -> Result<Arc<MapIndex>> {
        self.indexer.index(name)
    }

    /// Names of all indexes, sorted.
    pub fn index_names(&self) -> Vec<String> {
        self.indexer.index_names()
    }

    /// Stop index maintenance. Commits still succeed and queue up.
    pub fn pause_indexing(&self) {
        self.indexer.pause();
    }

    /// Resume index maintenance.
    pub fn resume_indexing(&self) {
        self.indexer.resume();
    }

    /// Block until every commit so far is indexed, or `timeout` passes.
    ///
    /// Returns whether the indexer caught up.
    pub fn wait_for_indexing(&self, timeout: Duration) -> bool {
        let target = self.store.current_position();
        self.indexer.watermark().wait_for(target, timeout)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub(crate) fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Effective configuration.
    pub fn config(&self) -> &LinkDbConfig {
        &self.config
    }

    /// Data directory, `None` for in-memory databases.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Whether [`shutdown`](Self::shutdown) has not been called yet.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    /// Counters.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            documents: self.store.len(),
            position: self.store.current_position(),
            indexer: self.indexer.stats(),
            durability: self.store.durability(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Fsync the WAL.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Stop the indexer and flush. Further writes are rejected.
    pub fn shutdown(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.indexer.shutdown();
        self.flush()?;
        info!(path = ?self.data_dir, "database shut down");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "error while closing database");
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .field("store", &self.store)
            .field("indexer", &self.indexer)
            .finish()
    }
}
