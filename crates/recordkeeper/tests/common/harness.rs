//! Test harness for isolated lifecycle tests.
//!
//! Every harness owns its own temporary directory with a SQLite file, seeded
//! with one office, two users and a fixed set of classifications.

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use recordkeeper::db::audit_repo;
use recordkeeper::db::lookup_repo::{self, ClassificationRow};
use recordkeeper::db::record_repo::{self, RecordRow};
use recordkeeper::{
    Actor, ActionType, Database, EngineSettings, LifecycleEngine, NewRecord, RecordStatus,
};

use super::builders::RecordBuilder;

pub const OFFICE_ID: i64 = 1;
pub const CLERK_ID: i64 = 3;
pub const ADMIN_ID: i64 = 7;

/// "5 years active + 10 years storage"
pub const CLASS_COMBINED: i64 = 1;
/// "Permanent"
pub const CLASS_PERMANENT: i64 = 2;
/// "10 years"
pub const CLASS_BARE: i64 = 3;
/// "2 years active + 3 years storage"
pub const CLASS_SHORT: i64 = 4;
/// "To be determined by the records officer"
pub const CLASS_UNPARSED: i64 = 5;
/// "0 years active + 0 years storage"
pub const CLASS_ZERO: i64 = 6;

const CLASSIFICATIONS: &[(i64, &str, &str)] = &[
    (CLASS_COMBINED, "FIN-01", "5 years active + 10 years storage"),
    (CLASS_PERMANENT, "LEG-01", "Permanent"),
    (CLASS_BARE, "ADM-01", "10 years"),
    (CLASS_SHORT, "ADM-02", "2 years active + 3 years storage"),
    (CLASS_UNPARSED, "MISC-01", "To be determined by the records officer"),
    (CLASS_ZERO, "MISC-02", "0 years active + 0 years storage"),
];

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid test date")
}

/// Test harness providing an isolated engine over a seeded database file.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Path of the SQLite file within temp_dir.
    pub db_path: PathBuf,
    pub engine: LifecycleEngine,
}

impl TestHarness {
    /// Create a new harness with default engine settings.
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("recordkeeper.db");
        let db = Database::open(&db_path).expect("Failed to open test database");

        db.with_conn(|conn| {
            lookup_repo::insert_office(conn, OFFICE_ID, "Records Management")?;
            lookup_repo::insert_user(conn, CLERK_ID, "Records Clerk", Some(OFFICE_ID), Some(2))?;
            lookup_repo::insert_user(conn, ADMIN_ID, "Records Admin", Some(OFFICE_ID), Some(1))?;
            for (id, code, text) in CLASSIFICATIONS {
                lookup_repo::upsert_classification(
                    conn,
                    &ClassificationRow {
                        id: *id,
                        code: code.to_string(),
                        title: format!("{} records", code),
                        retention_text: text.to_string(),
                    },
                )?;
            }
            Ok(())
        })
        .expect("Failed to seed test database");

        Self {
            temp_dir,
            db_path,
            engine: LifecycleEngine::new(db, settings),
        }
    }

    /// Opens a second, independent connection to the same database file.
    pub fn second_engine(&self) -> LifecycleEngine {
        let db = Database::open(&self.db_path).expect("Failed to reopen test database");
        LifecycleEngine::new(db, *self.engine.settings())
    }

    pub fn clerk(&self) -> Actor {
        self.engine.resolve_actor(CLERK_ID).expect("clerk is seeded")
    }

    pub fn admin(&self) -> Actor {
        self.engine.resolve_actor(ADMIN_ID).expect("admin is seeded")
    }

    pub fn create(&self, input: NewRecord) -> RecordRow {
        self.engine
            .create_record(&input, &self.clerk())
            .expect("Failed to create test record")
    }

    pub fn record(&self, id: i64) -> RecordRow {
        self.engine
            .db()
            .with_conn(|conn| record_repo::find_by_id(conn, id))
            .expect("Failed to read record")
            .expect("record should exist")
    }

    pub fn status(&self, id: i64) -> RecordStatus {
        self.record(id).status
    }

    /// Creates `count` records and archives them with one sweep. Returns their ids.
    pub fn archived_records(&self, count: usize) -> Vec<i64> {
        let ids: Vec<i64> = (0..count)
            .map(|i| {
                self.create(
                    RecordBuilder::new(&format!("Archived {}", i))
                        .classification(CLASS_SHORT)
                        .period_from("2010-03-01")
                        .build(),
                )
                .id
            })
            .collect();
        let report = self
            .engine
            .evaluate_due_archival(date("2013-01-01"))
            .expect("archival sweep");
        assert_eq!(report.transitioned.len(), count);
        ids
    }

    pub fn count(&self, action: ActionType) -> u64 {
        self.engine.count_actions(action).expect("count actions")
    }

    /// Number of `status` field-change entries across all records.
    pub fn status_changes(&self) -> u64 {
        self.engine
            .db()
            .with_conn(|conn| audit_repo::count_field_changes(conn, "status"))
            .expect("count field changes")
    }

    /// Total rows in both audit tables.
    pub fn audit_rows(&self) -> i64 {
        self.engine
            .db()
            .with_conn(|conn| {
                let count = conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM disposal_action_logs)
                          + (SELECT COUNT(*) FROM field_change_logs)",
                    [],
                    |r| r.get(0),
                )?;
                Ok(count)
            })
            .expect("count audit rows")
    }

    pub fn request_count(&self) -> i64 {
        self.engine
            .db()
            .with_conn(|conn| {
                let count = conn.query_row("SELECT COUNT(*) FROM disposal_requests", [], |r| {
                    r.get(0)
                })?;
                Ok(count)
            })
            .expect("count requests")
    }
}
