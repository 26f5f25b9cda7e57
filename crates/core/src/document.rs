//! Documents, links and shape schemas
//!
//! A [`Document`] is a JSON object body tagged with the collection it belongs
//! to. A collection can register a [`ShapeSchema`] that names its link lists
//! and scalar lists; writes to that collection are validated against it.
//!
//! ## Links
//!
//! A [`Link`] embeds a reference to another document together with a
//! [`LinkSnapshot`] of that document's list field. The snapshot is whatever
//! the writer copied in at write time. The store never refreshes it;
//! bringing it up to date is the job of an explicit patch.

use crate::error::{Error, Result};
use crate::json::{validate_limits, Scalar};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;

/// Maximum key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;

/// Field name of a link's referenced key
pub const LINK_ID_FIELD: &str = "Id";

/// Field name of a link's denormalized list
pub const LINK_ACL_FIELD: &str = "Acl";

// =============================================================================
// DocKey
// =============================================================================

/// Unique document key, e.g. `ContactSpheres-1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocKey(String);

impl DocKey {
    /// Wrap a key. Validation happens on write, not here.
    pub fn new(key: impl Into<String>) -> Self {
        DocKey(key.into())
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the key is usable for a write.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::invalid_document("", "key must not be empty"));
        }
        if self.0.len() > MAX_KEY_LENGTH {
            return Err(Error::invalid_document(
                self.0.chars().take(32).collect::<String>(),
                format!("key length {} exceeds {} bytes", self.0.len(), MAX_KEY_LENGTH),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DocKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocKey {
    fn from(key: &str) -> Self {
        DocKey(key.to_string())
    }
}

impl From<String> for DocKey {
    fn from(key: String) -> Self {
        DocKey(key)
    }
}

impl From<&String> for DocKey {
    fn from(key: &String) -> Self {
        DocKey(key.clone())
    }
}

// =============================================================================
// Document
// =============================================================================

/// A semi-structured record: a collection name plus a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    collection: String,
    body: Value,
}

impl Document {
    /// Create a document. The body is expected to be a JSON object; anything
    /// else is rejected when the document is written.
    pub fn new(collection: impl Into<String>, body: Value) -> Self {
        Document {
            collection: collection.into(),
            body,
        }
    }

    /// Create a document with an empty object body.
    pub fn empty(collection: impl Into<String>) -> Self {
        Self::new(collection, Value::Object(Map::new()))
    }

    /// Collection (shape) name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The whole body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Mutable body, used by the script interpreter.
    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Consume into the body.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Top-level field lookup.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_object().and_then(|obj| obj.get(name))
    }

    /// Mutable top-level field lookup.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.body.as_object_mut().and_then(|obj| obj.get_mut(name))
    }

    /// Set a top-level field. No-op if the body is not an object.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        if let Some(obj) = self.body.as_object_mut() {
            obj.insert(name.into(), value);
        }
    }

    /// Decode a link list field. A missing field is an empty list.
    pub fn links(&self, field: &str) -> Result<Vec<Link>> {
        match self.field(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
                Error::Serialization(format!("field '{}' is not a link list: {}", field, e))
            }),
        }
    }

    /// Decode a scalar list field. A missing field is an empty list.
    pub fn scalar_list(&self, field: &str) -> Result<Vec<Scalar>> {
        match self.field(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    Scalar::from_json(item).ok_or_else(|| {
                        Error::Serialization(format!("field '{}' holds a non-scalar", field))
                    })
                })
                .collect(),
            Some(_) => Err(Error::Serialization(format!(
                "field '{}' is not a list",
                field
            ))),
        }
    }
}

// =============================================================================
// Link
// =============================================================================

/// Point-in-time copy of a referenced document's list field.
///
/// Never refreshed implicitly. Use [`LinkSnapshot::capture`] to take a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSnapshot(Vec<Scalar>);

impl LinkSnapshot {
    /// Snapshot from explicit values.
    pub fn new(values: Vec<Scalar>) -> Self {
        LinkSnapshot(values)
    }

    /// Copy `field` out of `source` as it is right now.
    pub fn capture(source: &Document, field: &str) -> Result<Self> {
        source.scalar_list(field).map(LinkSnapshot)
    }

    /// Snapshot values.
    pub fn values(&self) -> &[Scalar] {
        &self.0
    }

    /// Membership test.
    pub fn contains(&self, value: &Scalar) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Denormalized reference to another document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Referenced document key
    #[serde(rename = "Id")]
    pub id: String,
    /// Last-synchronized copy of the referenced document's list field
    #[serde(rename = "Acl", default)]
    pub acl: LinkSnapshot,
}

impl Link {
    /// Link with an empty snapshot.
    pub fn new(id: impl Into<String>) -> Self {
        Link {
            id: id.into(),
            acl: LinkSnapshot::default(),
        }
    }

    /// Link carrying a snapshot of `field` from the referenced document.
    pub fn snapshot_of(key: &DocKey, source: &Document, field: &str) -> Result<Self> {
        Ok(Link {
            id: key.as_str().to_string(),
            acl: LinkSnapshot::capture(source, field)?,
        })
    }

    /// JSON form, as embedded in a document body.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(LINK_ID_FIELD.to_string(), Value::String(self.id.clone()));
        obj.insert(
            LINK_ACL_FIELD.to_string(),
            Value::Array(self.acl.values().iter().map(Scalar::to_json).collect()),
        );
        Value::Object(obj)
    }
}

// =============================================================================
// ShapeSchema
// =============================================================================

/// Declared structure of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeSchema {
    /// Collection this schema applies to
    pub collection: String,
    /// Fields holding lists of links
    #[serde(default)]
    pub link_fields: Vec<String>,
    /// Fields holding lists of scalars
    #[serde(default)]
    pub list_fields: Vec<String>,
}

impl ShapeSchema {
    /// Schema with no declared fields.
    pub fn new(collection: impl Into<String>) -> Self {
        ShapeSchema {
            collection: collection.into(),
            link_fields: Vec::new(),
            list_fields: Vec::new(),
        }
    }

    /// Declare a link list field.
    pub fn with_link_field(mut self, field: impl Into<String>) -> Self {
        self.link_fields.push(field.into());
        self
    }

    /// Declare a scalar list field.
    pub fn with_list_field(mut self, field: impl Into<String>) -> Self {
        self.list_fields.push(field.into());
        self
    }

    /// Check declared fields. Absent fields are allowed.
    pub fn validate(&self, key: &DocKey, doc: &Document) -> Result<()> {
        for field in &self.link_fields {
            let Some(value) = doc.field(field) else {
                continue;
            };
            let items = value.as_array().ok_or_else(|| {
                Error::invalid_document(key.as_str(), format!("'{}' must be a list of links", field))
            })?;
            for (i, item) in items.iter().enumerate() {
                validate_link(key, field, i, item)?;
            }
        }
        for field in &self.list_fields {
            let Some(value) = doc.field(field) else {
                continue;
            };
            validate_scalar_list(key, &format!("'{}'", field), value)?;
        }
        Ok(())
    }
}

fn validate_link(key: &DocKey, field: &str, index: usize, item: &Value) -> Result<()> {
    let obj = item.as_object().ok_or_else(|| {
        Error::invalid_document(
            key.as_str(),
            format!("{}[{}] is not a link object", field, index),
        )
    })?;
    match obj.get(LINK_ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => {
            return Err(Error::invalid_document(
                key.as_str(),
                format!("{}[{}] is missing a link key", field, index),
            ))
        }
    }
    if let Some(acl) = obj.get(LINK_ACL_FIELD) {
        validate_scalar_list(key, &format!("{}[{}].{}", field, index, LINK_ACL_FIELD), acl)?;
    }
    Ok(())
}

fn validate_scalar_list(key: &DocKey, what: &str, value: &Value) -> Result<()> {
    let items = value.as_array().ok_or_else(|| {
        Error::invalid_document(key.as_str(), format!("{} must be a list", what))
    })?;
    if items.iter().any(|v| Scalar::from_json(v).is_none()) {
        return Err(Error::invalid_document(
            key.as_str(),
            format!("{} must only hold scalars", what),
        ));
    }
    Ok(())
}

/// Validate a document for a write: key, body shape, limits, then schema.
pub fn validate_document(key: &DocKey, doc: &Document, schema: Option<&ShapeSchema>) -> Result<()> {
    key.validate()?;
    if doc.collection().is_empty() {
        return Err(Error::invalid_document(
            key.as_str(),
            "collection must not be empty",
        ));
    }
    if !doc.body().is_object() {
        return Err(Error::invalid_document(
            key.as_str(),
            "body must be a JSON object",
        ));
    }
    validate_limits(doc.body()).map_err(|e| Error::invalid_document(key.as_str(), e.to_string()))?;
    if let Some(schema) = schema {
        schema.validate(key, doc)?;
    }
    Ok(())
}
