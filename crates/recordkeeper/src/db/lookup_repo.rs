//! Lookup repository: classifications, offices and the actor directory.

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;
use crate::actor::{Actor, SYSTEM_ACTOR_ID};

/// A classification row as consumed by the retention calculator.
#[derive(Debug, Clone)]
pub struct ClassificationRow {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub retention_text: String,
}

/// Inserts or replaces a classification.
pub fn upsert_classification(
    conn: &Connection,
    row: &ClassificationRow,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO classifications (id, code, title, retention_text) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET code = ?2, title = ?3, retention_text = ?4",
        params![row.id, row.code, row.title, row.retention_text],
    )?;
    Ok(())
}

/// Finds a classification by id.
pub fn find_classification(
    conn: &Connection,
    id: i64,
) -> Result<Option<ClassificationRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, title, retention_text FROM classifications WHERE id = ?1",
            params![id],
            |row| {
                Ok(ClassificationRow {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    title: row.get(2)?,
                    retention_text: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Returns the free-text retention description of a classification.
pub fn retention_text(
    conn: &Connection,
    classification_id: i64,
) -> Result<Option<String>, DatabaseError> {
    Ok(find_classification(conn, classification_id)?.map(|c| c.retention_text))
}

/// Inserts an office if it does not exist yet.
pub fn insert_office(conn: &Connection, id: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO offices (id, name) VALUES (?1, ?2)",
        params![id, name],
    )?;
    Ok(())
}

pub fn office_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM offices WHERE id = ?1)",
        params![id],
        |r| r.get(0),
    )?;
    Ok(exists)
}

/// Inserts a user into the actor directory.
pub fn insert_user(
    conn: &Connection,
    id: i64,
    name: &str,
    office_id: Option<i64>,
    role_id: Option<i64>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, office_id, role_id) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, office_id, role_id],
    )?;
    Ok(())
}

/// Resolves a user id to its attribution context.
///
/// Id `0` is the system actor and never touches the table.
pub fn resolve_actor(conn: &Connection, user_id: i64) -> Result<Option<Actor>, DatabaseError> {
    if user_id == SYSTEM_ACTOR_ID {
        return Ok(Some(Actor::system()));
    }

    let actor = conn
        .query_row(
            "SELECT id, office_id, role_id FROM users WHERE id = ?1",
            params![user_id],
            |row| Ok(Actor::user(row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_classification_upsert_and_lookup() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut row = ClassificationRow {
                id: 3,
                code: "FIN-02".to_string(),
                title: "Vouchers".to_string(),
                retention_text: "10 years".to_string(),
            };
            upsert_classification(conn, &row)?;
            row.retention_text = "5 years active + 10 years storage".to_string();
            upsert_classification(conn, &row)?;

            assert_eq!(
                retention_text(conn, 3)?.as_deref(),
                Some("5 years active + 10 years storage")
            );
            assert!(retention_text(conn, 99)?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_resolve_actor() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_office(conn, 2, "Records Section")?;
            insert_user(conn, 11, "Registrar", Some(2), Some(5))?;

            assert_eq!(resolve_actor(conn, 0)?, Some(Actor::system()));
            assert_eq!(
                resolve_actor(conn, 11)?,
                Some(Actor::user(11, Some(2), Some(5)))
            );
            assert_eq!(resolve_actor(conn, 12)?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_user_id_zero_is_reserved() {
        let db = test_db();
        let result = db.with_conn(|conn| insert_user(conn, 0, "Impostor", None, None));
        assert!(result.is_err());
    }

    #[test]
    fn test_office_exists() {
        let db = test_db();
        db.with_conn(|conn| {
            insert_office(conn, 1, "Registry")?;
            assert!(office_exists(conn, 1)?);
            assert!(!office_exists(conn, 2)?);
            Ok(())
        })
        .unwrap();
    }
}
