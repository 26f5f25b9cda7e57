//! Database engine for LinkDB
//!
//! This crate orchestrates the lower layers:
//! - Database: open/close, configuration, recovery
//! - Map indexes and the background indexer that maintains them
//! - Patch execution: by key, and scattered over the keys an index resolves
//! - Read-your-writes consistency through per-client sessions
//!
//! The engine is the only component that knows about:
//! - The relation between the store's write position and index freshness
//! - Cross-layer coordination (store + feed + indexer)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod consistency;
pub mod database;
pub mod index;
pub mod indexer;
pub mod patch;
pub mod session;

pub use consistency::{wait_for_read_your_writes, CancelHandle, QueryConsistency, Watermark};
pub use database::{Database, DatabaseStats, LinkDbConfig, CONFIG_FILE_NAME};
pub use index::{
    FieldValues, IndexDefinition, IndexStats, LinkIds, MapFunction, MapIndex, MapSpec,
};
pub use indexer::{Indexer, IndexerStats};
pub use patch::{BatchPatchResult, PatchExecutor};
pub use session::Session;
