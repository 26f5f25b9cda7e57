//! Script parameter bindings

use linkdb_core::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter name to scalar value, substituted into a script before it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Scalar>);

impl Bindings {
    /// No bindings.
    pub fn new() -> Self {
        Bindings(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.0.get(name)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Bindings(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let b = Bindings::new()
            .with("sphereId", "ContactSpheres-1")
            .with("friend", "user-1");
        assert_eq!(b.len(), 2);
        assert_eq!(b.get("friend"), Some(&Scalar::from("user-1")));
        assert_eq!(b.get("missing"), None);
    }

    #[test]
    fn test_json_shape_is_plain_object() {
        let b: Bindings = [("friend", "user-1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&b).unwrap(), r#"{"friend":"user-1"}"#);
        let back: Bindings = serde_json::from_str(r#"{"friend":"user-1","n":3}"#).unwrap();
        assert_eq!(back.get("n"), Some(&Scalar::Int(3)));
    }
}
