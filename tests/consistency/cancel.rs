//! Cancelling a read-your-writes wait.

use crate::common::*;
use linkdb::Error;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn cancel_from_another_thread_aborts_the_wait() {
    let db = create_test_db();
    let session = seed(&db, 1);
    db.pause_indexing();
    session.put(mask_key(2), mask(2)).unwrap();

    let cancel = session.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });

    let started = Instant::now();
    let err = session
        .query(SCOPE_INDEX, &scalar(SPHERE_KEY))
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    // Well under the default 5s bound
    assert!(started.elapsed() < Duration::from_secs(4));
    canceller.join().unwrap();
}

#[test]
fn cancellation_is_sticky_until_reset() {
    let db = create_test_db();
    let session = seed(&db, 1);
    db.pause_indexing();
    session.put(mask_key(2), mask(2)).unwrap();

    let cancel = session.cancel_handle();
    cancel.cancel();
    assert!(cancel.is_cancelled());
    for _ in 0..2 {
        assert!(matches!(
            session.query(SCOPE_INDEX, &scalar(SPHERE_KEY)),
            Err(Error::Cancelled)
        ));
    }

    cancel.reset();
    db.resume_indexing();
    assert_eq!(session.query(SCOPE_INDEX, &scalar(SPHERE_KEY)).unwrap().len(), 2);
}

#[test]
fn shutdown_wakes_waiters() {
    let db = create_test_db();
    let session = seed(&db, 1);
    db.pause_indexing();
    session.put(mask_key(2), mask(2)).unwrap();

    let closer = {
        let db = db.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            db.shutdown().unwrap();
        })
    };
    let started = Instant::now();
    assert!(matches!(
        session.query(SCOPE_INDEX, &scalar(SPHERE_KEY)),
        Err(Error::Closed)
    ));
    assert!(started.elapsed() < Duration::from_secs(4));
    closer.join().unwrap();
}
