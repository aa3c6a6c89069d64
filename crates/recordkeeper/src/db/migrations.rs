//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order. Every migration runs inside its own
//! `IMMEDIATE` transaction together with its `_migrations` bookkeeping row.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_reference_tables",
        sql: include_str!("sql/001_create_reference_tables.sql"),
    },
    Migration {
        version: 2,
        description: "create_records_table",
        sql: include_str!("sql/002_create_records.sql"),
    },
    Migration {
        version: 3,
        description: "create_disposal_request_tables",
        sql: include_str!("sql/003_create_disposal_requests.sql"),
    },
    Migration {
        version: 4,
        description: "create_audit_log_tables",
        sql: include_str!("sql/004_create_audit_logs.sql"),
    },
    Migration {
        version: 5,
        description: "make_audit_logs_append_only",
        sql: include_str!("sql/005_audit_append_only.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "BEGIN IMMEDIATE;
         CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         );
         COMMIT;",
    )?;

    for migration in MIGRATIONS {
        if let Err(e) = apply(conn, migration) {
            // Leave the connection usable if the batch failed mid-way.
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            });
        }
    }

    Ok(())
}

/// Applies one migration unless it is already recorded.
///
/// The version check runs under the write lock, so a second process
/// opening the same file waits and then sees the migration as applied.
fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    conn.execute_batch("BEGIN IMMEDIATE;")?;

    let applied: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = ?1)",
        [migration.version],
        |r| r.get(0),
    )?;
    if applied {
        return conn.execute_batch("COMMIT;");
    }

    log::info!(
        "Running migration v{}: {}",
        migration.version,
        migration.description
    );
    conn.execute_batch(migration.sql)?;
    conn.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )?;
    conn.execute_batch("COMMIT;")
}
