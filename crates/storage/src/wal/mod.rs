//! Write-ahead log for the document store
//!
//! A single append-only file, `linkdb.wal`, in the data directory. Every
//! commit appends one self-delimiting record (see [`encoding`]) before the
//! in-memory state changes, so replaying the file rebuilds the store and its
//! write position.
//!
//! Replay stops at the first incomplete or corrupt record. Everything before
//! it is kept, the tail is truncated so later appends start from a clean
//! boundary.
//!
//! A failed append truncates the file back to the end of the last good
//! record, so the position it was meant to log can be reused. If that
//! truncation fails too, the WAL refuses every later append.

pub mod durability;
pub mod encoding;

pub use durability::DurabilityMode;

use encoding::{decode_record, encode_record, Decoded};
use linkdb_core::{DocKey, Document, Result, WritePosition};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// WAL file name inside the data directory.
pub const WAL_FILE_NAME: &str = "linkdb.wal";

/// One committed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// Upsert of a whole document
    Put {
        /// Commit position
        position: WritePosition,
        /// Document key
        key: DocKey,
        /// New document state
        document: Document,
    },
    /// Removal of a document
    Delete {
        /// Commit position
        position: WritePosition,
        /// Document key
        key: DocKey,
    },
}

impl WalRecord {
    /// Commit position of the record.
    pub fn position(&self) -> WritePosition {
        match self {
            WalRecord::Put { position, .. } | WalRecord::Delete { position, .. } => *position,
        }
    }
}

/// Append-only WAL file.
pub struct Wal {
    path: PathBuf,
    file: File,
    /// End of the last fully appended record
    len: u64,
    /// Set when a failed append could not be rolled back
    failed: bool,
    mode: DurabilityMode,
}

impl Wal {
    /// Open (or create) the WAL in `dir` and return it with the records
    /// already on disk, in commit order.
    pub fn open(dir: &Path, mode: DurabilityMode) -> Result<(Wal, Vec<WalRecord>)> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(WAL_FILE_NAME);

        let mut bytes = Vec::new();
        if path.exists() {
            File::open(&path)?.read_to_end(&mut bytes)?;
        }

        let (records, valid_len) = replay(&bytes);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        if (valid_len as usize) < bytes.len() {
            warn!(
                path = %path.display(),
                valid_len,
                file_len = bytes.len(),
                "truncating WAL tail after last valid record"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        info!(
            path = %path.display(),
            records = records.len(),
            mode = mode.as_str(),
            "opened WAL"
        );

        let mut file = file;
        file.seek(SeekFrom::Start(valid_len))?;

        Ok((
            Wal {
                path,
                file,
                len: valid_len,
                failed: false,
                mode,
            },
            records,
        ))
    }

    /// Append a record and make it as durable as the mode requires.
    ///
    /// On error nothing of the record stays in the file.
    pub fn append(&mut self, record: &WalRecord) -> Result<()> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "WAL is unusable after a failed append",
            )
            .into());
        }
        let bytes = encode_record(record)?;
        if let Err(e) = self.write_record(&bytes) {
            warn!(
                path = %self.path.display(),
                position = record.position().as_u64(),
                error = %e,
                "WAL append failed, rolling back"
            );
            if let Err(rollback) = self.truncate(self.len) {
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "WAL rollback failed, refusing further appends"
                );
                self.failed = true;
            }
            return Err(e.into());
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        if self.mode.requires_immediate_fsync() {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file at `len` and continue writing from there.
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::Start(len))?;
        Ok(())
    }

    /// Fsync the file.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Whether a failed append left the WAL unusable.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Path of the WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(path = %self.path.display(), error = %e, "failed to sync WAL on close");
        }
    }
}

/// Decode every valid record. Returns the records and the byte length of
/// the valid prefix.
fn replay(bytes: &[u8]) -> (Vec<WalRecord>, u64) {
    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        match decode_record(&bytes[offset..], offset as u64) {
            Ok(Decoded::Record(record, used)) => {
                records.push(record);
                offset += used;
            }
            Ok(Decoded::Incomplete) => {
                warn!(offset, "incomplete WAL record, stopping replay");
                break;
            }
            Err(e) => {
                warn!(offset, error = %e, "corrupt WAL record, stopping replay");
                break;
            }
        }
    }
    (records, offset as u64)
}
