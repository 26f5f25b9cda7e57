//! Patch scripts for LinkDB
//!
//! A patch script is a short side-effect-only program over the bound
//! document (`this`). It is built from two list primitives:
//!
//! - **remove-where**: drop every element of a list matching a predicate
//! - **map-transform**: visit every element of a link list and mutate the
//!   ones matching a condition, leaving the rest as they are
//!
//! plus `push` for appending to a list.
//!
//! ```text
//! this.Acl.remove_where(item => item == friend);
//! this.Spheres.map(link => if link.Id == sphereId { link.Acl.push(friend) });
//! ```
//!
//! Identifiers that are not lambda parameters are script parameters. They are
//! substituted from [`Bindings`] by [`Script::bind`] before anything runs; a
//! missing binding is `Error::UnboundParameter`.

mod ast;
mod bindings;
mod interpreter;
mod parser;
mod token;

pub use ast::{Action, CmpOp, Expr, Operand, Statement};
pub use bindings::Bindings;
pub use parser::{ScriptParseError, MAX_EXPR_DEPTH};

use linkdb_core::{DocKey, Document, Error, Result};
use std::fmt;

/// A parsed, unbound script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    source: String,
    statements: Vec<Statement>,
}

impl Script {
    /// Parse script text.
    pub fn parse(source: &str) -> std::result::Result<Script, ScriptParseError> {
        Ok(Script {
            source: source.to_string(),
            statements: parser::parse(source)?,
        })
    }

    /// Original text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed statements.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Names of the script parameters, deduplicated, in order of first use.
    pub fn params(&self) -> Vec<&str> {
        let mut all = Vec::new();
        for s in &self.statements {
            s.visit_params(&mut all);
        }
        let mut seen = Vec::with_capacity(all.len());
        for name in all {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Substitute every parameter from `bindings`.
    ///
    /// Extra bindings are ignored. The first parameter without a binding
    /// fails with `UnboundParameter`.
    pub fn bind(&self, bindings: &Bindings) -> Result<BoundScript> {
        if let Some(missing) = self.params().into_iter().find(|p| bindings.get(p).is_none()) {
            return Err(Error::UnboundParameter {
                name: missing.to_string(),
            });
        }
        let mut statements = self.statements.clone();
        for s in &mut statements {
            s.visit_params_mut(&mut |operand: &mut Operand| {
                if let Operand::Param(name) = operand {
                    if let Some(value) = bindings.get(name) {
                        *operand = Operand::Literal(value.clone());
                    }
                }
            });
        }
        Ok(BoundScript { statements })
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Script {
    type Err = ScriptParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Script::parse(s)
    }
}

/// A script with all parameters substituted, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundScript {
    statements: Vec<Statement>,
}

impl BoundScript {
    /// Run against `doc` in place. On error `doc` may be partially modified;
    /// use [`BoundScript::run`] for copy-on-success.
    pub fn apply(&self, key: &DocKey, doc: &mut Document) -> Result<()> {
        interpreter::execute(&self.statements, key, doc)
    }

    /// Run against a copy of `doc`, returning the patched copy.
    pub fn run(&self, key: &DocKey, doc: &Document) -> Result<Document> {
        let mut copy = doc.clone();
        self.apply(key, &mut copy)?;
        Ok(copy)
    }
}

/// Parse and bind in one step.
pub fn compile(source: &str, bindings: &Bindings) -> Result<BoundScript> {
    Script::parse(source)?.bind(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdb_core::Scalar;
    use proptest::prelude::*;
    use serde_json::json;

    const REMOVE_FRIEND: &str = "this.Acl.remove_where(item => item == friend);";
    const PUSH_TO_SPHERE: &str =
        "this.Spheres.map(link => if link.Id == sphereId { link.Acl.push(friend) });";

    fn sphere() -> (DocKey, Document) {
        (
            DocKey::from("ContactSpheres-1"),
            Document::new(
                "ContactSpheres",
                json!({"Acl": ["user-1", "user-2", "user-3"]}),
            ),
        )
    }

    fn mask() -> (DocKey, Document) {
        (
            DocKey::from("SocialMasks-1"),
            Document::new(
                "SocialMasks",
                json!({"Spheres": [
                    {"Id": "ContactSpheres-1", "Acl": []},
                    {"Id": "ContactSpheres-2", "Acl": ["user-9"]}
                ]}),
            ),
        )
    }

    #[test]
    fn test_remove_where_absent_value_is_noop() {
        let (key, doc) = sphere();
        let bound = compile(REMOVE_FRIEND, &Bindings::new().with("friend", "user")).unwrap();
        let out = bound.run(&key, &doc).unwrap();
        assert_eq!(out, doc);
    }

    #[test]
    fn test_remove_where_present_value() {
        let (key, doc) = sphere();
        let bound = compile(REMOVE_FRIEND, &Bindings::new().with("friend", "user-1")).unwrap();
        let out = bound.run(&key, &doc).unwrap();
        assert_eq!(out.field("Acl"), Some(&json!(["user-2", "user-3"])));
    }

    #[test]
    fn test_map_transform_only_touches_matching_links() {
        let (key, doc) = mask();
        let bound = compile(
            PUSH_TO_SPHERE,
            &Bindings::new()
                .with("sphereId", "ContactSpheres-1")
                .with("friend", "user-1"),
        )
        .unwrap();
        let out = bound.run(&key, &doc).unwrap();
        assert_eq!(
            out.field("Spheres"),
            Some(&json!([
                {"Id": "ContactSpheres-1", "Acl": ["user-1"]},
                {"Id": "ContactSpheres-2", "Acl": ["user-9"]}
            ]))
        );
    }

    #[test]
    fn test_map_transform_without_match_leaves_document() {
        let (key, doc) = mask();
        let bound = compile(
            PUSH_TO_SPHERE,
            &Bindings::new()
                .with("sphereId", "NotExistSphere")
                .with("friend", "user-1"),
        )
        .unwrap();
        assert_eq!(bound.run(&key, &doc).unwrap(), doc);
    }

    #[test]
    fn test_push_creates_missing_link_list() {
        let key = DocKey::from("SocialMasks-2");
        let doc = Document::new("SocialMasks", json!({"Spheres": [{"Id": "ContactSpheres-1"}]}));
        let bound = compile(
            "this.Spheres.map(l => l.Acl.push('user-1'))",
            &Bindings::new(),
        )
        .unwrap();
        let out = bound.run(&key, &doc).unwrap();
        assert_eq!(out.links("Spheres").unwrap()[0].acl.len(), 1);
    }

    #[test]
    fn test_unbound_parameter() {
        let script = Script::parse(PUSH_TO_SPHERE).unwrap();
        assert_eq!(script.params(), vec!["sphereId", "friend"]);
        let err = script
            .bind(&Bindings::new().with("sphereId", "ContactSpheres-1"))
            .unwrap_err();
        assert!(matches!(err, Error::UnboundParameter { name } if name == "friend"));
    }

    #[test]
    fn test_extra_bindings_ignored() {
        let bound = compile(
            REMOVE_FRIEND,
            &Bindings::new().with("friend", "user-1").with("unused", 1i64),
        );
        assert!(bound.is_ok());
    }

    #[test]
    fn test_missing_field_is_script_error() {
        let (key, doc) = sphere();
        let bound = compile("this.Members.remove_where(m => m == 1)", &Bindings::new()).unwrap();
        let err = bound.run(&key, &doc).unwrap_err();
        assert!(matches!(err, Error::ScriptError { key, .. } if key == "ContactSpheres-1"));
    }

    #[test]
    fn test_type_mismatch_is_script_error() {
        let key = DocKey::from("d");
        let doc = Document::new("c", json!({"Acl": "not-a-list"}));
        let bound = compile("this.Acl.push(1)", &Bindings::new()).unwrap();
        assert!(matches!(
            bound.run(&key, &doc),
            Err(Error::ScriptError { .. })
        ));
    }

    #[test]
    fn test_non_bool_condition_is_script_error() {
        let (key, doc) = sphere();
        let bound = compile("this.Acl.remove_where(x => x)", &Bindings::new()).unwrap();
        let err = bound.run(&key, &doc).unwrap_err();
        assert!(err.to_string().contains("expected bool"));
    }

    #[test]
    fn test_failed_run_leaves_original_untouched() {
        let (key, doc) = sphere();
        // First statement succeeds, second fails: nothing is kept.
        let bound = compile(
            "this.Acl.push('user-4'); this.Missing.map(x => x.Acl.push(1))",
            &Bindings::new(),
        )
        .unwrap();
        assert!(bound.run(&key, &doc).is_err());
        assert_eq!(doc.scalar_list("Acl").unwrap().len(), 3);
    }

    #[test]
    fn test_nested_remove_where_sees_outer_element() {
        let key = DocKey::from("m");
        let doc = Document::new(
            "SocialMasks",
            json!({"Spheres": [{"Id": "a", "Acl": ["a", "b"]}, {"Id": "b", "Acl": ["a", "b"]}]}),
        );
        // Remove from each link's Acl the entry equal to that link's own Id
        let bound = compile(
            "this.Spheres.map(l => l.Acl.remove_where(u => u == l.Id))",
            &Bindings::new(),
        )
        .unwrap();
        let out = bound.run(&key, &doc).unwrap();
        assert_eq!(
            out.field("Spheres"),
            Some(&json!([{"Id": "a", "Acl": ["b"]}, {"Id": "b", "Acl": ["a"]}]))
        );
    }

    #[test]
    fn test_numeric_bindings_compare_by_value() {
        let key = DocKey::from("d");
        let doc = Document::new("c", json!({"Levels": [1, 2.0, 3]}));
        let bound = compile(
            "this.Levels.remove_where(x => x == n)",
            &Bindings::new().with("n", 2i64),
        )
        .unwrap();
        assert_eq!(bound.run(&key, &doc).unwrap().field("Levels"), Some(&json!([1, 3])));
    }

    fn acl_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(vec!["u1", "u2", "u3", "u4"]), 0..12)
            .prop_map(|v| v.into_iter().map(String::from).collect())
    }

    proptest! {
        #[test]
        fn prop_remove_absent_is_identity(acl in acl_strategy()) {
            let key = DocKey::from("ContactSpheres-1");
            let doc = Document::new("ContactSpheres", json!({ "Acl": acl }));
            let bound = compile(REMOVE_FRIEND, &Bindings::new().with("friend", "absent")).unwrap();
            prop_assert_eq!(bound.run(&key, &doc).unwrap(), doc);
        }

        #[test]
        fn prop_remove_present_drops_exactly_matches_and_is_fixed_point(
            acl in acl_strategy(),
            target in prop::sample::select(vec!["u1", "u2", "u3", "u4"]),
        ) {
            let key = DocKey::from("ContactSpheres-1");
            let doc = Document::new("ContactSpheres", json!({ "Acl": acl.clone() }));
            let bound = compile(REMOVE_FRIEND, &Bindings::new().with("friend", target)).unwrap();

            let once = bound.run(&key, &doc).unwrap();
            let remaining = once.scalar_list("Acl").unwrap();
            let expected: Vec<Scalar> = acl
                .iter()
                .filter(|v| v.as_str() != target)
                .map(|v| Scalar::from(v.as_str()))
                .collect();
            prop_assert_eq!(&remaining, &expected);

            let twice = bound.run(&key, &once).unwrap();
            prop_assert_eq!(twice, once);
        }
    }
}
