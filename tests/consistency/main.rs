//! Read-your-writes integration tests.
//!
//! The indexer is paused to stand in for a slow indexer, so every wait below
//! is deterministic.

#[path = "../common/mod.rs"]
mod common;

mod cancel;
mod slow_indexer;
