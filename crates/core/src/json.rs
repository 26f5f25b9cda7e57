//! JSON helpers for document bodies
//!
//! Document bodies are plain `serde_json` objects. This module adds:
//! - Document limits checked on every write
//! - [`Scalar`]: the value type of script bindings, ACL entries and index terms
//!
//! # Document Size Limits
//!
//! | Limit | Value | Constant |
//! |-------|-------|----------|
//! | Max document size | 16 MB | [`MAX_DOCUMENT_SIZE`] |
//! | Max nesting depth | 100 levels | [`MAX_NESTING_DEPTH`] |
//! | Max array size | 1M elements | [`MAX_ARRAY_SIZE`] |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Document Size Limits
// =============================================================================

/// Maximum document size in bytes (16 MB)
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum nesting depth in a document body (100 levels)
///
/// Keeps recursive validation, scripting and serialization off the edge of the stack.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Maximum array size in elements (1 million elements)
pub const MAX_ARRAY_SIZE: usize = 1_000_000;

/// Error type for document limit violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Document exceeds maximum size
    #[error("document size {size} exceeds maximum of {max} bytes")]
    DocumentTooLarge {
        /// Actual document size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Document nesting exceeds maximum depth
    #[error("document nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Actual nesting depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Array exceeds maximum size
    #[error("array size {size} exceeds maximum of {max} elements")]
    ArrayTooLarge {
        /// Actual array size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}

/// Maximum nesting depth of a value. Scalars are depth 0.
pub fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => 0,
        Value::Array(arr) => 1 + arr.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(obj) => 1 + obj.values().map(nesting_depth).max().unwrap_or(0),
    }
}

/// Largest array anywhere inside the value.
pub fn max_array_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => 0,
        Value::Array(arr) => arr
            .len()
            .max(arr.iter().map(max_array_size).max().unwrap_or(0)),
        Value::Object(obj) => obj.values().map(max_array_size).max().unwrap_or(0),
    }
}

/// Check size, depth and array limits, returning the first violation.
pub fn validate_limits(value: &Value) -> Result<(), LimitError> {
    let depth = nesting_depth(value);
    if depth > MAX_NESTING_DEPTH {
        return Err(LimitError::NestingTooDeep {
            depth,
            max: MAX_NESTING_DEPTH,
        });
    }
    let array = max_array_size(value);
    if array > MAX_ARRAY_SIZE {
        return Err(LimitError::ArrayTooLarge {
            size: array,
            max: MAX_ARRAY_SIZE,
        });
    }
    // Size last: it serializes the whole body
    let size = value.to_string().len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(LimitError::DocumentTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(())
}

// =============================================================================
// Scalar
// =============================================================================

/// A scalar JSON value.
///
/// Script bindings, ACL entries and index terms are all scalars. Equality
/// follows JSON semantics except that an integer and a float compare equal
/// when they denote the same number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating-point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl Scalar {
    /// Convert a JSON value to a scalar; `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Scalar> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert to a JSON value. Non-finite floats become null.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::Number((*i).into()),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(Value::Null, Value::Number),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the scalar's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }

    /// Index term for this scalar. Numbers that compare equal share a term,
    /// so `2` and `2.0` find the same documents; a string never collides
    /// with a number.
    pub fn index_term(&self) -> IndexTerm {
        match self {
            Scalar::Null => IndexTerm::Null,
            Scalar::Bool(b) => IndexTerm::Bool(*b),
            Scalar::Int(i) => IndexTerm::Number(i.to_string()),
            Scalar::Float(f) => match exact_int(*f) {
                Some(i) => IndexTerm::Number(i.to_string()),
                None => IndexTerm::Number(f.to_string()),
            },
            Scalar::String(s) => IndexTerm::String(s.clone()),
        }
    }
}

/// The integer `f` is exactly equal to, if any.
fn exact_int(f: f64) -> Option<i64> {
    // i64::MIN is -2^63 exactly; 2^63 itself is out of range
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -TWO_POW_63 && f < TWO_POW_63 {
        Some(f as i64)
    } else {
        None
    }
}

/// Hashable key under which a scalar is stored in an index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexTerm {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Number in canonical text form
    Number(String),
    /// String
    String(String),
}

impl fmt::Display for IndexTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTerm::Null => f.write_str("null"),
            IndexTerm::Bool(b) => write!(f, "{}", b),
            IndexTerm::Number(n) => f.write_str(n),
            IndexTerm::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            (Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => {
                exact_int(*b) == Some(*a)
            }
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        v.to_json()
    }
}
