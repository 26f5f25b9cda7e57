//! Patch by index.

use crate::common::*;
use linkdb::{Bindings, DocKey, Document, Error, IndexDefinition, Script};
use serde_json::json;

fn push_bindings(friend: &str) -> Bindings {
    Bindings::new()
        .with("sphereId", SPHERE_KEY)
        .with("friend", friend)
}

#[test]
fn one_failure_does_not_abort_the_batch() {
    let db = create_test_db();
    let session = seed(&db, 5);
    // Links to the sphere, but the link has an Acl that is not a list
    session
        .put(
            mask_key(6),
            Document::new(
                "SocialMasks",
                json!({"Spheres": [{"Id": SPHERE_KEY, "Acl": "broken"}]}),
            ),
        )
        .unwrap();

    let result = session
        .patch_by_index(
            SCOPE_INDEX,
            &scalar(SPHERE_KEY),
            &Script::parse(PUSH_TO_SPHERE).unwrap(),
            &push_bindings("users/9"),
        )
        .unwrap();
    assert_eq!(result.matched, 6);
    assert_eq!(result.patched(), 5);
    assert_eq!(result.failed(), 1);
    let (key, err) = result.errors().next().unwrap();
    assert_eq!(key, &mask_key(6));
    assert!(matches!(err, Error::ScriptError { .. }));
}

#[test]
fn field_value_index_drives_patches() {
    let db = create_test_db();
    let session = db.session();
    for (n, owner) in [(1, "users/1"), (2, "users/2"), (3, "users/1")] {
        session
            .put(
                DocKey::new(format!("ContactSpheres-{}", n)),
                Document::new("ContactSpheres", json!({"Owner": owner, "Acl": []})),
            )
            .unwrap();
    }
    db.create_index(&IndexDefinition::field_values(
        "ByOwner",
        &["ContactSpheres"],
        "Owner",
    ))
    .unwrap();

    let result = session
        .patch_by_index(
            "ByOwner",
            &scalar("users/1"),
            &Script::parse("this.Acl.push(friend)").unwrap(),
            &Bindings::new().with("friend", "users/7"),
        )
        .unwrap();
    assert_eq!(result.patched(), 2);
    assert_eq!(
        session
            .get(&DocKey::from("ContactSpheres-2"))
            .unwrap()
            .field("Acl"),
        Some(&json!([]))
    );
}

#[test]
fn unknown_index_is_an_error() {
    let db = create_test_db();
    let session = seed(&db, 1);
    let err = session
        .patch_by_index(
            "Nope",
            &scalar(SPHERE_KEY),
            &Script::parse(PUSH_TO_SPHERE).unwrap(),
            &push_bindings("users/1"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::IndexNotFound { .. }));
}

#[test]
fn deleted_masks_drop_out_of_the_index() {
    let db = create_test_db();
    let session = seed(&db, 4);
    session.delete(&mask_key(2)).unwrap();

    let result = session
        .patch_by_index(
            SCOPE_INDEX,
            &scalar(SPHERE_KEY),
            &Script::parse(PUSH_TO_SPHERE).unwrap(),
            &push_bindings("users/1"),
        )
        .unwrap();
    assert_eq!(result.matched, 3);
    assert!(result.results.iter().all(|(k, _)| k != &mask_key(2)));
}

#[test]
fn concurrent_sessions_do_not_lose_patches() {
    let db = create_test_db();
    seed(&db, 8);
    let push = Script::parse(PUSH_TO_SPHERE).unwrap();

    std::thread::scope(|s| {
        for t in 0..4 {
            let db = &db;
            let push = &push;
            s.spawn(move || {
                let session = db.session();
                let friend = format!("users/t{}", t);
                let result = session
                    .patch_by_index(SCOPE_INDEX, &scalar(SPHERE_KEY), push, &push_bindings(&friend))
                    .unwrap();
                assert_eq!(result.patched(), 8);
            });
        }
    });

    for n in 1..=8 {
        let acl = link_acl(&db.store().get(&mask_key(n)).unwrap(), SPHERE_KEY);
        assert_eq!(acl.len(), 3 + 4);
    }
}
