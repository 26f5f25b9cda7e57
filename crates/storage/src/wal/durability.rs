//! Durability mode for WAL operations.
//!
//! Defines the durability guarantees for WAL writes.

use linkdb_core::{Error, Result};
use std::str::FromStr;

/// Durability mode for WAL writes.
///
/// | Mode | On commit | Use Case |
/// |------|-----------|----------|
/// | InMemory | nothing | Tests, caches, ephemeral data |
/// | Standard | flush to OS | Default on disk |
/// | Always | flush + fsync | Zero data loss |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// No persistence - all data lost on exit.
    ///
    /// Bypasses the WAL entirely. No file I/O.
    InMemory,

    /// Buffered writes are handed to the OS on every commit and fsynced on
    /// `flush()` and on close. A crash of the process loses nothing; a crash
    /// of the machine may lose the unsynced tail.
    #[default]
    Standard,

    /// fsync after every commit (slow, maximum durability).
    Always,
}

impl DurabilityMode {
    /// Check if this mode requires WAL persistence.
    ///
    /// Returns false for InMemory mode, true for all others.
    pub fn requires_wal(&self) -> bool {
        !matches!(self, DurabilityMode::InMemory)
    }

    /// Check if this mode requires immediate fsync on every commit.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Name as written in `linkdb.toml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DurabilityMode::InMemory => "in_memory",
            DurabilityMode::Standard => "standard",
            DurabilityMode::Always => "always",
        }
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::InMemory => "No persistence (fastest, all data lost on exit)",
            DurabilityMode::Standard => "Flush every commit, fsync on close",
            DurabilityMode::Always => "Fsync every commit (safest, slowest)",
        }
    }
}

impl FromStr for DurabilityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in_memory" => Ok(DurabilityMode::InMemory),
            "standard" => Ok(DurabilityMode::Standard),
            "always" => Ok(DurabilityMode::Always),
            other => Err(Error::Config(format!(
                "invalid durability mode '{}', expected \"in_memory\", \"standard\" or \"always\"",
                other
            ))),
        }
    }
}
