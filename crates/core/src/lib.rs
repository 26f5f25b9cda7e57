//! Core types for LinkDB
//!
//! This crate defines the foundational types used throughout the system:
//! - DocKey, Document: keyed semi-structured records
//! - Link, LinkSnapshot: denormalized references between documents
//! - ShapeSchema: per-collection structure used to validate writes
//! - WritePosition: commit order of the document store
//! - Scalar: values of bindings, ACL entries and index terms
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod json;
pub mod position;

pub use document::{
    validate_document, DocKey, Document, Link, LinkSnapshot, ShapeSchema, LINK_ACL_FIELD,
    LINK_ID_FIELD, MAX_KEY_LENGTH,
};
pub use error::{Error, Result};
pub use json::{
    validate_limits, IndexTerm, LimitError, Scalar, MAX_ARRAY_SIZE, MAX_DOCUMENT_SIZE,
    MAX_NESTING_DEPTH,
};
pub use position::WritePosition;
