//! Patch by key.

use crate::common::*;
use linkdb::{Bindings, DocKey, Error, PatchStatus, Script, ShapeSchema};
use serde_json::json;

#[test]
fn missing_key_is_success_without_mutation() {
    let db = create_test_db();
    let session = seed(&db, 1);
    let before = db.store().current_position();

    let status = session
        .patch(
            &DocKey::from("ContactSpheres-404"),
            &Script::parse(REMOVE_FRIEND).unwrap(),
            &Bindings::new().with("friend", "users/1"),
        )
        .unwrap();
    assert_eq!(status, PatchStatus::DocumentDoesNotExist);
    assert_eq!(db.store().current_position(), before);
    assert!(matches!(
        session.get(&DocKey::from("ContactSpheres-404")),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn remove_is_a_fixed_point() {
    let db = create_test_db();
    let session = seed(&db, 0);
    let key = DocKey::from(SPHERE_KEY);
    let remove = Script::parse(REMOVE_FRIEND).unwrap();
    let bindings = Bindings::new().with("friend", "users/2");

    assert!(session.patch(&key, &remove, &bindings).unwrap().is_patched());
    assert_eq!(
        session.patch(&key, &remove, &bindings).unwrap(),
        PatchStatus::NotModified
    );
    assert_eq!(
        session.get(&key).unwrap().field("Acl"),
        Some(&json!(["users/1", "users/3"]))
    );
}

#[test]
fn unbound_parameter_fails_before_touching_anything() {
    let db = create_test_db();
    let session = seed(&db, 0);
    let before = db.store().current_position();
    let err = session
        .patch(
            &DocKey::from(SPHERE_KEY),
            &Script::parse(REMOVE_FRIEND).unwrap(),
            &Bindings::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnboundParameter { name } if name == "friend"));
    assert_eq!(db.store().current_position(), before);
}

#[test]
fn failed_script_leaves_document() {
    let db = create_test_db();
    let session = seed(&db, 0);

    // Name is a string, not a list
    let err = session
        .patch(
            &DocKey::from(SPHERE_KEY),
            &Script::parse("this.Name.push('x')").unwrap(),
            &Bindings::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::ScriptError { .. }));
    assert_eq!(session.get(&DocKey::from(SPHERE_KEY)).unwrap(), sphere());
}

#[test]
fn patched_document_is_revalidated() {
    let db = create_test_db();
    db.register_shape(ShapeSchema::new("SocialMasks").with_link_field("Spheres"));
    let session = seed(&db, 1);

    // The script runs fine, but a bare string is not a link
    let err = session
        .patch(
            &mask_key(1),
            &Script::parse("this.Spheres.push('ContactSpheres-3')").unwrap(),
            &Bindings::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDocument { .. }));
    assert_eq!(session.get(&mask_key(1)).unwrap(), mask(1));
}
