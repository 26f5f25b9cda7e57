//! Storage layer for LinkDB
//!
//! This crate implements the document store with:
//! - DocumentStore: DashMap-sharded documents with per-key write serialization
//! - Atomic partial updates through bound patch scripts
//! - ChangeFeed: ordered stream of commits consumed by the indexer
//! - Write-ahead log with CRC-framed MessagePack records and replay on open

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod feed;
pub mod store;
pub mod wal;

pub use feed::{Change, ChangeFeed, ChangeKind};
pub use store::{DocumentStore, PatchStatus, StoredDocument};
pub use wal::{DurabilityMode, Wal, WalRecord};
