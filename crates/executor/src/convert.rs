//! Conversion from engine errors to executor errors.

use crate::Error;
use linkdb_core::Error as CoreError;

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { key } => Error::DocumentNotFound { key },
            CoreError::IndexNotFound { name } => Error::IndexNotFound { name },
            CoreError::InvalidDocument { key, reason } => Error::InvalidDocument { key, reason },
            CoreError::InvalidScript { reason } => Error::InvalidScript { reason },
            CoreError::UnboundParameter { name } => Error::UnboundParameter { name },
            CoreError::ScriptError { key, reason } => Error::ScriptFailed { key, reason },
            CoreError::IndexStaleTimeout {
                index,
                required,
                reached,
                waited_ms,
            } => Error::IndexStale {
                index,
                required,
                reached,
                waited_ms,
            },
            CoreError::Cancelled => Error::Cancelled,
            CoreError::IndexExists { name } => Error::IndexExists { name },
            CoreError::Closed => Error::Closed,
            CoreError::Io(e) => Error::Io {
                reason: e.to_string(),
            },
            CoreError::Serialization(reason) => Error::Serialization { reason },
            CoreError::Corruption(reason) => Error::Corruption { reason },
            CoreError::Config(reason) => Error::Config { reason },
        }
    }
}

impl From<linkdb_script::ScriptParseError> for Error {
    fn from(err: linkdb_script::ScriptParseError) -> Self {
        Error::from(CoreError::from(err))
    }
}

/// Convert an engine result.
pub(crate) fn convert_result<T>(r: linkdb_core::Result<T>) -> crate::Result<T> {
    r.map_err(Error::from)
}
