//! Database module for persistent storage.
//!
//! Uses rusqlite (SQLite) with a thread-safe `Database` handle.
//! All access is serialized through a `Mutex<Connection>`. Repository
//! functions take a plain `&Connection` so they run the same way on a
//! bare connection and inside a `Transaction`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod audit_repo;
pub mod error;
pub mod lookup_repo;
pub mod migrations;
pub mod record_repo;
pub mod request_repo;

pub use error::DatabaseError;

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). WAL mode is enabled for file
/// databases so dashboard-style readers in other processes never block
/// the lifecycle writers.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside one `IMMEDIATE` transaction.
    ///
    /// The write lock is taken at `BEGIN`, so any check `f` performs
    /// still holds when its writes commit. Commits when `f` returns
    /// `Ok`; any error rolls back every write made inside `f`.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(DatabaseError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Returns the canonical database path: `~/.recordkeeper/data/recordkeeper.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| {
        h.join(".recordkeeper")
            .join("data")
            .join("recordkeeper.db")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("recordkeeper.db"));
        assert!(path.to_string_lossy().contains(".recordkeeper"));
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.with_transaction(|tx| {
            tx.execute("INSERT INTO offices (id, name) VALUES (1, 'Registry')", [])
                .map_err(DatabaseError::from)?;
            Ok::<_, DatabaseError>(())
        })
        .unwrap();

        let count: u32 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM offices", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<(), DatabaseError> = db.with_transaction(|tx| {
            tx.execute("INSERT INTO offices (id, name) VALUES (1, 'Registry')", [])?;
            Err(DatabaseError::LockPoisoned)
        });
        assert!(result.is_err());

        let count: u32 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM offices", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_database_is_clone() {
        let db = Database::open_in_memory().unwrap();
        let db2 = db.clone();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO offices (id, name) VALUES (7, 'Legal')", [])?;
            Ok(())
        })
        .unwrap();
        db2.with_conn(|conn| {
            let count: u32 = conn.query_row("SELECT COUNT(*) FROM offices", [], |r| r.get(0))?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }
}
