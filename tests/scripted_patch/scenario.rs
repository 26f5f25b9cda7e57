//! The sphere-and-thirteen-masks walkthrough, end to end.

use crate::common::*;
use linkdb::{Bindings, DocKey, PatchStatus, Script};
use serde_json::json;

#[test]
fn thirteen_masks_walkthrough() {
    let db = create_test_db();
    let session = seed(&db, 13);
    let sphere_key = DocKey::from(SPHERE_KEY);
    let remove = Script::parse(REMOVE_FRIEND).unwrap();

    // Removing an absent entry changes nothing
    let status = session
        .patch(&sphere_key, &remove, &Bindings::new().with("friend", "nonexistent"))
        .unwrap();
    assert_eq!(status, PatchStatus::NotModified);
    assert_eq!(
        session.get(&sphere_key).unwrap().field("Acl"),
        Some(&json!(["users/1", "users/2", "users/3"]))
    );

    // Removing a present entry drops exactly it
    let status = session
        .patch(&sphere_key, &remove, &Bindings::new().with("friend", "users/1"))
        .unwrap();
    assert!(status.is_patched());
    assert_eq!(
        session.get(&sphere_key).unwrap().field("Acl"),
        Some(&json!(["users/2", "users/3"]))
    );

    let push = Script::parse(PUSH_TO_SPHERE).unwrap();

    // A link key nothing references resolves to no documents
    let none = session
        .patch_by_index(
            SCOPE_INDEX,
            &scalar("NotExistSphere"),
            &push,
            &Bindings::new()
                .with("sphereId", "NotExistSphere")
                .with("friend", "users/4"),
        )
        .unwrap();
    assert_eq!(none.matched, 0);
    assert_eq!(none.patched(), 0);
    assert!(none.is_success());

    // The sphere's key resolves to all thirteen masks
    let before: Vec<_> = (1..=13)
        .map(|n| link_acl(&session.get(&mask_key(n)).unwrap(), SPHERE_KEY))
        .collect();
    let all = session
        .patch_by_index(
            SCOPE_INDEX,
            &scalar(SPHERE_KEY),
            &push,
            &Bindings::new()
                .with("sphereId", SPHERE_KEY)
                .with("friend", "users/4"),
        )
        .unwrap();
    assert_eq!(all.matched, 13);
    assert_eq!(all.patched(), 13);
    assert!(all.is_success());

    for (n, old) in (1..=13).zip(before) {
        let doc = session.get(&mask_key(n)).unwrap();
        let acl = link_acl(&doc, SPHERE_KEY);
        assert_eq!(acl.len(), old.len() + 1, "mask {}", n);
        assert_eq!(acl.last(), Some(&json!("users/4")));
        // The other link is untouched
        assert!(link_acl(&doc, OTHER_SPHERE_KEY).is_empty());
    }
}
