//! Database configuration via `linkdb.toml`
//!
//! On first open, a default `linkdb.toml` is created in the data directory.
//! To change settings, edit the file and reopen the database.

use crate::consistency::QueryConsistency;
use linkdb_core::{Error, Result};
use linkdb_storage::DurabilityMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "linkdb.toml";

/// Database configuration loaded from `linkdb.toml`.
///
/// # Example
///
/// ```toml
/// durability = "standard"
/// index_wait_timeout_ms = 5000
/// default_consistency = "read_your_writes"
/// indexer_batch_size = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDbConfig {
    /// Durability mode: `"in_memory"`, `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Upper bound on a read-your-writes wait, in milliseconds.
    #[serde(default = "default_index_wait_timeout_ms")]
    pub index_wait_timeout_ms: u64,
    /// Consistency of new sessions: `"read_your_writes"` or `"stale_ok"`.
    #[serde(default = "default_consistency_str")]
    pub default_consistency: String,
    /// Maximum number of changes the indexer applies per batch.
    #[serde(default = "default_indexer_batch_size")]
    pub indexer_batch_size: usize,
}

fn default_durability_str() -> String {
    "standard".to_string()
}

fn default_index_wait_timeout_ms() -> u64 {
    5000
}

fn default_consistency_str() -> String {
    "read_your_writes".to_string()
}

fn default_indexer_batch_size() -> usize {
    256
}

impl Default for LinkDbConfig {
    fn default() -> Self {
        Self {
            durability: default_durability_str(),
            index_wait_timeout_ms: default_index_wait_timeout_ms(),
            default_consistency: default_consistency_str(),
            indexer_batch_size: default_indexer_batch_size(),
        }
    }
}

impl LinkDbConfig {
    /// Defaults with no WAL, for `Database::in_memory()`.
    pub fn in_memory() -> Self {
        Self {
            durability: DurabilityMode::InMemory.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Parse the durability string.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        self.durability.parse()
    }

    /// Parse the default consistency string.
    pub fn consistency(&self) -> Result<QueryConsistency> {
        self.default_consistency.parse()
    }

    /// Read-your-writes wait bound.
    pub fn index_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.index_wait_timeout_ms)
    }

    /// Check every value.
    pub fn validate(&self) -> Result<()> {
        self.durability_mode()?;
        self.consistency()?;
        if self.indexer_batch_size == 0 {
            return Err(Error::Config(
                "indexer_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# LinkDB database configuration
#
# Durability mode: "standard" (default), "always" or "in_memory"
#   "standard"  = flush every commit, fsync on flush and close
#   "always"    = fsync every commit, zero data loss
#   "in_memory" = no write-ahead log, everything is lost on close
durability = "standard"

# How long a read-your-writes index query waits for the indexer (ms).
index_wait_timeout_ms = 5000

# Consistency of new sessions: "read_your_writes" (default) or "stale_ok"
default_consistency = "read_your_writes"

# Maximum number of commits the indexer applies per batch.
indexer_batch_size = 256
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: LinkDbConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
