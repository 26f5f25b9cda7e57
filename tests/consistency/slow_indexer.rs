//! Waits against a paused indexer.

use crate::common::*;
use linkdb::{Bindings, Error, QueryConsistency, Script};
use std::thread;
use std::time::{Duration, Instant};

fn push(session: &linkdb::Session) -> linkdb::Result<linkdb::BatchPatchResult> {
    session.patch_by_index(
        SCOPE_INDEX,
        &scalar(SPHERE_KEY),
        &Script::parse(PUSH_TO_SPHERE).unwrap(),
        &Bindings::new()
            .with("sphereId", SPHERE_KEY)
            .with("friend", "users/8"),
    )
}

#[test]
fn stale_index_times_out_with_positions() {
    let test_db = TestDb::with_wait_timeout(Duration::from_millis(50));
    let db = &test_db.db;
    let session = seed(db, 2);
    assert!(db.wait_for_indexing(Duration::from_secs(5)));
    let indexed = db.index(SCOPE_INDEX).unwrap().indexed_through();

    db.pause_indexing();
    let written = session.put(mask_key(3), mask(3)).unwrap();

    match push(&session) {
        Err(Error::IndexStaleTimeout {
            index,
            required,
            reached,
            waited_ms,
        }) => {
            assert_eq!(index, SCOPE_INDEX);
            assert_eq!(required, written.as_u64());
            assert_eq!(reached, indexed.as_u64());
            assert!(waited_ms >= 50);
        }
        other => panic!("unexpected: {:?}", other.map(|r| r.matched)),
    }
    // Nothing was patched while stale
    assert_eq!(db.store().current_position(), written);

    db.resume_indexing();
    let result = push(&session).unwrap();
    assert_eq!(result.matched, 3);
    assert_eq!(result.patched(), 3);
}

#[test]
fn patch_by_index_is_delayed_until_the_indexer_catches_up() {
    let test_db = TestDb::new();
    let db = test_db.db.clone();
    let session = seed(&db, 2);

    db.pause_indexing();
    session.put(mask_key(3), mask(3)).unwrap();

    let delay = Duration::from_millis(150);
    let resumer = {
        let db = db.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            db.resume_indexing();
        })
    };

    let started = Instant::now();
    let result = push(&session).unwrap();
    assert!(started.elapsed() >= delay);
    // The mask written just before is included, never a stale result
    assert_eq!(result.matched, 3);
    resumer.join().unwrap();
}

#[test]
fn index_reflects_session_writes_after_wait() {
    let db = create_test_db();
    let session = seed(&db, 0);
    let index = db.index(SCOPE_INDEX).unwrap();

    for n in 1..=20 {
        let position = session.put(mask_key(n), mask(n)).unwrap();
        session.wait_for_read_your_writes(&index).unwrap();
        assert!(index.indexed_through() >= position);
    }
    assert_eq!(index.query(&scalar(SPHERE_KEY)).len(), 20);
}

#[test]
fn stale_ok_reads_without_waiting() {
    let db = create_test_db();
    let mut session = seed(&db, 1);
    session.set_consistency(QueryConsistency::StaleOk);

    db.pause_indexing();
    session.put(mask_key(2), mask(2)).unwrap();
    let keys = session.query(SCOPE_INDEX, &scalar(SPHERE_KEY)).unwrap();
    assert_eq!(keys, vec![mask_key(1)]);

    db.resume_indexing();
    assert!(db.wait_for_indexing(Duration::from_secs(5)));
    let keys = session.query(SCOPE_INDEX, &scalar(SPHERE_KEY)).unwrap();
    assert_eq!(keys, vec![mask_key(1), mask_key(2)]);
}

#[test]
fn other_sessions_do_not_wait_for_foreign_writes() {
    let test_db = TestDb::with_wait_timeout(Duration::from_millis(20));
    let db = &test_db.db;
    seed(db, 1);

    db.pause_indexing();
    let writer = db.session();
    writer.put(mask_key(2), mask(2)).unwrap();

    // A fresh session has written nothing, so it reads immediately
    let reader = db.session();
    assert_eq!(
        reader.query(SCOPE_INDEX, &scalar(SPHERE_KEY)).unwrap(),
        vec![mask_key(1)]
    );
    assert!(matches!(
        writer.query(SCOPE_INDEX, &scalar(SPHERE_KEY)),
        Err(Error::IndexStaleTimeout { .. })
    ));
    db.resume_indexing();
}
