//! Dispatch tests: each command reaches the engine and maps to its output.

use super::{scope_index, seed_masks, PUSH_TO_SPHERE};
use crate::{Bindings, Command, Error, Executor, Output, PatchStatus, Scalar};
use linkdb_engine::Database;
use serde_json::json;

fn create_executor() -> Executor {
    Executor::new(Database::in_memory().unwrap())
}

fn load(executor: &Executor, masks: usize) {
    for cmd in seed_masks(masks) {
        executor.execute(cmd).unwrap();
    }
    executor.execute(scope_index()).unwrap();
}

#[test]
fn test_ping() {
    let executor = create_executor();
    match executor.execute(Command::Ping).unwrap() {
        Output::Pong { version } => assert!(!version.is_empty()),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_put_get_delete() {
    let executor = create_executor();
    let put = executor
        .execute(Command::Put {
            key: "ContactSpheres-1".into(),
            collection: "ContactSpheres".into(),
            body: json!({"Acl": ["users/1"]}),
        })
        .unwrap();
    assert_eq!(put, Output::Position(1));

    match executor
        .execute(Command::Get {
            key: "ContactSpheres-1".into(),
        })
        .unwrap()
    {
        Output::Document(view) => {
            assert_eq!(view.collection, "ContactSpheres");
            assert_eq!(view.body, json!({"Acl": ["users/1"]}));
        }
        other => panic!("unexpected: {:?}", other),
    }

    assert_eq!(
        executor
            .execute(Command::Delete {
                key: "ContactSpheres-1".into()
            })
            .unwrap(),
        Output::Position(2)
    );
    assert_eq!(
        executor.execute(Command::Get {
            key: "ContactSpheres-1".into()
        }),
        Err(Error::DocumentNotFound {
            key: "ContactSpheres-1".into()
        })
    );
}

#[test]
fn test_put_rejects_non_object() {
    let executor = create_executor();
    let result = executor.execute(Command::Put {
        key: "x".into(),
        collection: "ContactSpheres".into(),
        body: json!([1, 2]),
    });
    assert!(matches!(result, Err(Error::InvalidDocument { .. })));
}

#[test]
fn test_patch_remove_absent_then_present() {
    let executor = create_executor();
    load(&executor, 0);
    let remove = |friend: &str| Command::Patch {
        key: "ContactSpheres-1".into(),
        script: "this.Acl.remove_where(item => item == friend)".into(),
        bindings: Bindings::new().with("friend", friend),
    };

    assert_eq!(
        executor.execute(remove("users/9")).unwrap(),
        Output::Patch(PatchStatus::NotModified)
    );
    assert!(matches!(
        executor.execute(remove("users/2")).unwrap(),
        Output::Patch(PatchStatus::Patched(_))
    ));
}

#[test]
fn test_patch_missing_document_is_not_an_error() {
    let executor = create_executor();
    let out = executor
        .execute(Command::Patch {
            key: "ContactSpheres-404".into(),
            script: "this.Acl.push('x')".into(),
            bindings: Bindings::new(),
        })
        .unwrap();
    assert_eq!(out, Output::Patch(PatchStatus::DocumentDoesNotExist));
}

#[test]
fn test_patch_bad_script_is_invalid_script() {
    let executor = create_executor();
    let result = executor.execute(Command::Patch {
        key: "ContactSpheres-1".into(),
        script: "this.Acl.push(".into(),
        bindings: Bindings::new(),
    });
    assert!(matches!(result, Err(Error::InvalidScript { .. })));
}

#[test]
fn test_patch_by_index_touches_every_match() {
    let executor = create_executor();
    load(&executor, 13);

    let out = executor
        .execute(Command::PatchByIndex {
            index: "ScopeIndex".into(),
            query: Scalar::from("ContactSpheres-1"),
            script: PUSH_TO_SPHERE.into(),
            bindings: Bindings::new()
                .with("sphereId", "ContactSpheres-1")
                .with("friend", "users/1"),
        })
        .unwrap();
    match out {
        Output::BatchPatch(summary) => {
            assert_eq!(summary.matched, 13);
            assert_eq!(summary.patched, 13);
            assert_eq!(summary.failed, 0);
        }
        other => panic!("unexpected: {:?}", other),
    }

    match executor
        .execute(Command::Get {
            key: "SocialMasks-7".into(),
        })
        .unwrap()
    {
        Output::Document(view) => assert_eq!(
            view.body["Spheres"],
            json!([
                {"Id": "ContactSpheres-1", "Acl": ["users/1"]},
                {"Id": "ContactSpheres-2", "Acl": []}
            ])
        ),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_patch_by_index_unbound_parameter_fails_whole_call() {
    let executor = create_executor();
    load(&executor, 2);
    let result = executor.execute(Command::PatchByIndex {
        index: "ScopeIndex".into(),
        query: Scalar::from("ContactSpheres-1"),
        script: PUSH_TO_SPHERE.into(),
        bindings: Bindings::new().with("sphereId", "ContactSpheres-1"),
    });
    assert_eq!(
        result,
        Err(Error::UnboundParameter {
            name: "friend".into()
        })
    );
}

#[test]
fn test_query_and_missing_index() {
    let executor = create_executor();
    load(&executor, 3);
    assert_eq!(
        executor
            .execute(Command::Query {
                index: "ScopeIndex".into(),
                value: Scalar::from("ContactSpheres-2"),
            })
            .unwrap(),
        Output::Keys(vec![
            "SocialMasks-1".into(),
            "SocialMasks-2".into(),
            "SocialMasks-3".into()
        ])
    );
    assert_eq!(
        executor.execute(Command::Query {
            index: "Nope".into(),
            value: Scalar::from("x"),
        }),
        Err(Error::IndexNotFound {
            name: "Nope".into()
        })
    );
}

#[test]
fn test_create_index_twice() {
    let executor = create_executor();
    executor.execute(scope_index()).unwrap();
    assert_eq!(
        executor.execute(scope_index()),
        Err(Error::IndexExists {
            name: "ScopeIndex".into()
        })
    );
}

#[test]
fn test_stats_and_flush() {
    let executor = create_executor();
    load(&executor, 4);
    assert_eq!(executor.execute(Command::Flush).unwrap(), Output::Unit);
    match executor.execute(Command::Stats).unwrap() {
        Output::Stats(stats) => {
            assert_eq!(stats.documents, 5);
            assert_eq!(stats.position, 5);
            assert_eq!(stats.indexes, vec!["ScopeIndex".to_string()]);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_closed_database_rejects_writes() {
    let executor = create_executor();
    executor.database().shutdown().unwrap();
    let result = executor.execute(Command::Put {
        key: "a".into(),
        collection: "c".into(),
        body: json!({}),
    });
    assert_eq!(result, Err(Error::Closed));
}
