//! Map indexes over document collections
//!
//! A map index projects every document of its source collections to zero or
//! more scalar values and answers point lookups `value -> keys`. Indexes are
//! maintained asynchronously by the [`Indexer`](crate::Indexer) from the
//! store's change feed.
//!
//! Map functions are a trait so embedders can define their own projection.
//! The two built-ins cover link references and plain field values, and have a
//! serializable description ([`MapSpec`]) for the command surface.

mod map;

pub use map::{IndexStats, MapIndex};
pub(crate) use map::panic_message;

use linkdb_core::{Document, Error, Result, Scalar, LINK_ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Projection from a document to the values it is indexed under.
pub trait MapFunction: Send + Sync + fmt::Debug {
    /// Values to index `doc` under. Duplicates are allowed and collapse.
    ///
    /// An error means the document is malformed for this index; it then
    /// contributes nothing until a later version maps cleanly.
    fn map(&self, doc: &Document) -> Result<Vec<Scalar>>;
}

/// Index every link of a link list by the key it references.
///
/// `LinkIds { field: "Spheres" }` answers "which masks link to this sphere".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkIds {
    /// Link list field
    pub field: String,
}

impl MapFunction for LinkIds {
    fn map(&self, doc: &Document) -> Result<Vec<Scalar>> {
        let items = match doc.field(&self.field) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(Error::Serialization(format!(
                    "field '{}' is not a link list",
                    self.field
                )))
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(i, link)| match link.get(LINK_ID_FIELD) {
                Some(Value::String(id)) => Ok(Scalar::String(id.clone())),
                _ => Err(Error::Serialization(format!(
                    "{}[{}] has no string '{}'",
                    self.field, i, LINK_ID_FIELD
                ))),
            })
            .collect()
    }
}

/// Index a scalar field, or each element of a scalar list field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValues {
    /// Field to index
    pub field: String,
}

impl MapFunction for FieldValues {
    fn map(&self, doc: &Document) -> Result<Vec<Scalar>> {
        match doc.field(&self.field) {
            None => Ok(Vec::new()),
            Some(Value::Array(_)) => doc.scalar_list(&self.field),
            Some(value) => Scalar::from_json(value).map(|s| vec![s]).ok_or_else(|| {
                Error::Serialization(format!("field '{}' is an object", self.field))
            }),
        }
    }
}

/// Serializable description of a built-in map function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapSpec {
    /// See [`LinkIds`]
    LinkIds {
        /// Link list field
        field: String,
    },
    /// See [`FieldValues`]
    FieldValues {
        /// Field to index
        field: String,
    },
}

impl MapSpec {
    /// Instantiate the map function.
    pub fn build(&self) -> Arc<dyn MapFunction> {
        match self {
            MapSpec::LinkIds { field } => Arc::new(LinkIds {
                field: field.clone(),
            }),
            MapSpec::FieldValues { field } => Arc::new(FieldValues {
                field: field.clone(),
            }),
        }
    }
}

/// A named index over one or more collections.
///
/// ```text
/// { "name": "ScopeIndex", "collections": ["SocialMasks"],
///   "map": { "type": "link_ids", "field": "Spheres" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name
    pub name: String,
    /// Source collections
    pub collections: Vec<String>,
    /// Projection
    pub map: MapSpec,
}

impl IndexDefinition {
    /// Index of link references in `field` across `collections`.
    pub fn link_ids(
        name: impl Into<String>,
        collections: &[&str],
        field: impl Into<String>,
    ) -> Self {
        IndexDefinition {
            name: name.into(),
            collections: collections.iter().map(|c| c.to_string()).collect(),
            map: MapSpec::LinkIds {
                field: field.into(),
            },
        }
    }

    /// Index of the values of `field` across `collections`.
    pub fn field_values(
        name: impl Into<String>,
        collections: &[&str],
        field: impl Into<String>,
    ) -> Self {
        IndexDefinition {
            name: name.into(),
            collections: collections.iter().map(|c| c.to_string()).collect(),
            map: MapSpec::FieldValues {
                field: field.into(),
            },
        }
    }

    /// Reject definitions that could never match anything.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("index name must not be empty".into()));
        }
        if self.collections.is_empty() || self.collections.iter().any(|c| c.is_empty()) {
            return Err(Error::Config(format!(
                "index '{}' needs at least one non-empty collection",
                self.name
            )));
        }
        let field = match &self.map {
            MapSpec::LinkIds { field } | MapSpec::FieldValues { field } => field,
        };
        if field.is_empty() {
            return Err(Error::Config(format!(
                "index '{}' maps an empty field name",
                self.name
            )));
        }
        Ok(())
    }
}
