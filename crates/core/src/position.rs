//! Write positions
//!
//! A [`WritePosition`] marks commit order in the document store. The store
//! advances it on every successful commit; the indexer reports how far it
//! has caught up in the same unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic commit sequence number. Position 0 means nothing was written.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WritePosition(u64);

impl WritePosition {
    /// The position before any write.
    pub const ZERO: WritePosition = WritePosition(0);

    /// Wrap a raw position.
    pub const fn new(raw: u64) -> Self {
        WritePosition(raw)
    }

    /// Raw value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The position immediately after this one.
    #[inline]
    pub const fn next(self) -> Self {
        WritePosition(self.0 + 1)
    }

    /// True if nothing has been written yet.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WritePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<u64> for WritePosition {
    fn from(raw: u64) -> Self {
        WritePosition(raw)
    }
}

impl From<WritePosition> for u64 {
    fn from(p: WritePosition) -> Self {
        p.0
    }
}
