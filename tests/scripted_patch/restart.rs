//! Patched documents survive a restart; indexes are redefined and backfilled.

use crate::common::*;
use linkdb::{Bindings, DocKey, IndexDefinition, Script};
use serde_json::json;

#[test]
fn patches_replay_from_the_wal() {
    let mut test_db = TestDb::new();
    {
        let session = seed(&test_db.db, 3);
        session
            .patch_by_index(
                SCOPE_INDEX,
                &scalar(SPHERE_KEY),
                &Script::parse(PUSH_TO_SPHERE).unwrap(),
                &Bindings::new()
                    .with("sphereId", SPHERE_KEY)
                    .with("friend", "users/5"),
            )
            .unwrap();
    }
    let position = test_db.db.store().current_position();

    test_db.reopen();
    assert_eq!(test_db.db.store().current_position(), position);
    assert!(test_db.db.index_names().is_empty());

    let doc = test_db.db.store().get(&mask_key(2)).unwrap();
    assert_eq!(link_acl(&doc, SPHERE_KEY).last(), Some(&json!("users/5")));

    test_db
        .db
        .create_index(&IndexDefinition::link_ids(
            SCOPE_INDEX,
            &["SocialMasks"],
            "Spheres",
        ))
        .unwrap();
    let keys = test_db.db.session().query(SCOPE_INDEX, &scalar(SPHERE_KEY)).unwrap();
    assert_eq!(keys, vec![mask_key(1), mask_key(2), mask_key(3)]);
}

#[test]
fn config_file_written_on_first_open() {
    let test_db = TestDb::new();
    let path = test_db.db_path().join(linkdb::CONFIG_FILE_NAME);
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("durability"));
    assert!(test_db
        .db
        .store()
        .get(&DocKey::from("nothing"))
        .is_err());
}
