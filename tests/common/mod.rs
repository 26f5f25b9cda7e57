//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use linkdb::{Database, DocKey, Document, IndexDefinition, LinkDbConfig, Scalar, Session};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;

pub const SPHERE_KEY: &str = "ContactSpheres-1";
pub const OTHER_SPHERE_KEY: &str = "ContactSpheres-2";
pub const SCOPE_INDEX: &str = "ScopeIndex";

/// Remove every ACL entry equal to `friend`.
pub const REMOVE_FRIEND: &str = "this.Acl.remove_where(item => item == friend)";

/// Append `friend` to the ACL of every link to `sphereId`.
pub const PUSH_TO_SPHERE: &str =
    "this.Spheres.map(link => if link.Id == sphereId { link.Acl.push(friend) })";

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test writer. Set `RUST_LOG`-style filtering with
/// the subscriber's default (`INFO`).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// TestDb
// ============================================================================

/// On-disk test database in a temporary directory.
pub struct TestDb {
    pub db: Arc<Database>,
    pub dir: TempDir,
}

impl TestDb {
    /// Create a test database with standard durability.
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::open(dir.path()).expect("Failed to create test database");
        TestDb { db, dir }
    }

    /// Create a test database with a short read-your-writes bound.
    pub fn with_wait_timeout(timeout: Duration) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = LinkDbConfig {
            index_wait_timeout_ms: timeout.as_millis() as u64,
            ..LinkDbConfig::default()
        };
        let db = Database::open_with_config(dir.path(), config)
            .expect("Failed to create test database");
        TestDb { db, dir }
    }

    pub fn db_path(&self) -> &Path {
        self.dir.path()
    }

    /// Close and reopen from the same directory (simulates restart).
    pub fn reopen(&mut self) {
        self.db.shutdown().expect("shutdown");
        self.db = Database::open(self.dir.path()).expect("Failed to reopen database");
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory database.
pub fn create_test_db() -> Arc<Database> {
    init_tracing();
    Database::in_memory().expect("Failed to create in-memory database")
}

// ============================================================================
// Fixtures
// ============================================================================

/// The link source: a contact sphere with three ACL entries.
pub fn sphere() -> Document {
    Document::new(
        "ContactSpheres",
        json!({"Name": "Friends", "Acl": ["users/1", "users/2", "users/3"]}),
    )
}

/// A social mask linking to the main sphere and one other.
pub fn mask(n: usize) -> Document {
    Document::new(
        "SocialMasks",
        json!({
            "Name": format!("mask {}", n),
            "Spheres": [
                {"Id": SPHERE_KEY, "Acl": ["users/1", "users/2", "users/3"]},
                {"Id": OTHER_SPHERE_KEY, "Acl": []}
            ]
        }),
    )
}

pub fn mask_key(n: usize) -> DocKey {
    DocKey::new(format!("SocialMasks-{}", n))
}

/// Store the sphere and `masks` masks, then define the scope index.
pub fn seed(db: &Arc<Database>, masks: usize) -> Session {
    let session = db.session();
    session.put(DocKey::from(SPHERE_KEY), sphere()).expect("put sphere");
    for n in 1..=masks {
        session.put(mask_key(n), mask(n)).expect("put mask");
    }
    db.create_index(&IndexDefinition::link_ids(
        SCOPE_INDEX,
        &["SocialMasks"],
        "Spheres",
    ))
    .expect("create index");
    session
}

/// ACL of the link to `sphere_key` inside a mask.
pub fn link_acl(doc: &Document, sphere_key: &str) -> Vec<Value> {
    doc.field("Spheres")
        .and_then(Value::as_array)
        .and_then(|links| links.iter().find(|l| l["Id"] == sphere_key))
        .and_then(|l| l["Acl"].as_array().cloned())
        .unwrap_or_default()
}

pub fn scalar(s: &str) -> Scalar {
    Scalar::from(s)
}
