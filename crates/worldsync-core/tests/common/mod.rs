//! Shared helpers for worldsync-core integration tests.

#![allow(dead_code)]

use std::sync::Once;

use worldsync_core::{ImportConfig, InMemoryGroupStore, InputRow};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Configuration shared by the scenarios: one `course` world type and a
/// template for `CLE-course` worlds.
pub fn test_config() -> ImportConfig {
    ImportConfig::from_json(
        r#"{
            "members.csv": {
                "roleMaps": {
                    "course": { "Student": "member", "Instructor": "manager" }
                }
            },
            "worlds.csv": {
                "customProperties": ["grouping", "building"],
                "worldTemplateMap": { "CLE-course": "/var/templates/worlds/course/basic" },
                "globalGrouping": "campus"
            }
        }"#,
    )
    .expect("test config parses")
}

/// Membership rows numbered from line 1.
pub fn member_rows(rows: &[(&str, &str, &str)]) -> Vec<InputRow> {
    rows.iter()
        .enumerate()
        .map(|(idx, (user, world, role))| InputRow::new(idx + 1, [*user, *world, *role]))
        .collect()
}

/// A store holding course worlds `w1`..`w3` with `member` and `manager` roles.
pub fn course_store() -> InMemoryGroupStore {
    InMemoryGroupStore::new()
        .with_world("w1", "course", &["member", "manager"])
        .with_world("w2", "course", &["member", "manager"])
        .with_world("w3", "course", &["member", "manager"])
}
