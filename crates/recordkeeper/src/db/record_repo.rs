//! Record repository: the Record Store operations on the `records` table.
//!
//! Status writes go through [`update_status`], a compare-and-set that only
//! touches the row when its current status is one of the expected sources.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::lifecycle::{RecordStatus, TimeValue};

/// The editable, retention-derived attributes of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    pub title: String,
    pub description: Option<String>,
    pub classification_id: i64,
    pub office_id: i64,
    pub period_from: NaiveDate,
    pub period_to: Option<NaiveDate>,
    pub active_years: u32,
    pub storage_years: u32,
    pub total_years: u32,
    pub time_value: TimeValue,
}

/// A record row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: i64,
    pub fields: RecordFields,
    pub status: RecordStatus,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let period_to: Option<String> = row.get("period_to")?;
        Ok(Self {
            id: row.get("id")?,
            fields: RecordFields {
                title: row.get("title")?,
                description: row.get("description")?,
                classification_id: row.get("classification_id")?,
                office_id: row.get("office_id")?,
                period_from: parse_text_column(row, "period_from")?,
                period_to: period_to
                    .map(|raw| parse_value("period_to", &raw))
                    .transpose()?,
                active_years: row.get("active_years")?,
                storage_years: row.get("storage_years")?,
                total_years: row.get("total_years")?,
                time_value: parse_text_column(row, "time_value")?,
            },
            status: parse_text_column(row, "status")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Reads a TEXT column and parses it into a domain type.
pub(crate) fn parse_text_column<T>(row: &Row<'_>, column: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.get(column)?;
    parse_value(column, &raw)
}

pub(crate) fn parse_value<T>(column: &str, raw: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("column '{}': {}", column, e).into(),
        )
    })
}

/// Renders a date the way it is stored (`YYYY-MM-DD`).
pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inserts a new record and returns its id.
pub fn insert(
    conn: &Connection,
    fields: &RecordFields,
    status: RecordStatus,
    created_by: i64,
    now: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO records (title, description, classification_id, office_id, period_from,
         period_to, active_years, storage_years, total_years, time_value, status,
         created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
        params![
            fields.title,
            fields.description,
            fields.classification_id,
            fields.office_id,
            date_to_sql(fields.period_from),
            fields.period_to.map(date_to_sql),
            fields.active_years,
            fields.storage_years,
            fields.total_years,
            fields.time_value.as_str(),
            status.as_str(),
            created_by,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites the editable fields of a record. Status is not touched.
pub fn update_fields(
    conn: &Connection,
    id: i64,
    fields: &RecordFields,
    now: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE records SET title = ?2, description = ?3, classification_id = ?4,
         office_id = ?5, period_from = ?6, period_to = ?7, active_years = ?8,
         storage_years = ?9, total_years = ?10, time_value = ?11, updated_at = ?12
         WHERE id = ?1",
        params![
            id,
            fields.title,
            fields.description,
            fields.classification_id,
            fields.office_id,
            date_to_sql(fields.period_from),
            fields.period_to.map(date_to_sql),
            fields.active_years,
            fields.storage_years,
            fields.total_years,
            fields.time_value.as_str(),
            now,
        ],
    )?;
    Ok(changed)
}

/// Finds a record by its id.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<RecordRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM records WHERE id = ?1",
            params![id],
            RecordRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists all records currently in `status`, ordered by id.
pub fn list_by_status(
    conn: &Connection,
    status: RecordStatus,
) -> Result<Vec<RecordRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM records WHERE status = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![status.as_str()], RecordRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active/Inactive temporary records whose `period_to` is on or before `today`.
pub fn list_due_for_archival(
    conn: &Connection,
    today: NaiveDate,
) -> Result<Vec<RecordRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM records
         WHERE status IN ('Active', 'Inactive')
           AND time_value = 'Temporary'
           AND period_to IS NOT NULL
           AND period_to <= ?1
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![date_to_sql(today)], RecordRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active temporary records that carry a retention period and started on
/// or before `today`. The caller applies the disposal-date formula.
pub fn list_disposal_candidates(
    conn: &Connection,
    today: NaiveDate,
) -> Result<Vec<RecordRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM records
         WHERE status = 'Active'
           AND time_value = 'Temporary'
           AND total_years > 0
           AND period_from <= ?1
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![date_to_sql(today)], RecordRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Compare-and-set status update.
///
/// Writes `to` only when the current status is one of `expected`.
/// Returns the number of rows changed (0 or 1).
pub fn update_status(
    conn: &Connection,
    id: i64,
    expected: &[RecordStatus],
    to: RecordStatus,
    now: &str,
) -> Result<usize, DatabaseError> {
    if expected.is_empty() {
        return Ok(0);
    }

    let placeholders: Vec<String> = (0..expected.len()).map(|i| format!("?{}", i + 4)).collect();
    let sql = format!(
        "UPDATE records SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status IN ({})",
        placeholders.join(", ")
    );

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    param_values.push(Box::new(id));
    param_values.push(Box::new(to.as_str()));
    param_values.push(Box::new(now.to_string()));
    for status in expected {
        param_values.push(Box::new(status.as_str()));
    }

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let changed = conn.execute(&sql, params_ref.as_slice())?;
    Ok(changed)
}

/// Counts records with the given status.
pub fn count_by_status(conn: &Connection, status: RecordStatus) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE status = ?1",
        params![status.as_str()],
        |r| r.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{lookup_repo, Database};

    const NOW: &str = "2026-01-01T00:00:00Z";

    fn test_db() -> Database {
        let db = Database::open_in_memory().expect("Failed to create test database");
        db.with_conn(|conn| {
            lookup_repo::insert_office(conn, 1, "Registry")?;
            lookup_repo::upsert_classification(
                conn,
                &lookup_repo::ClassificationRow {
                    id: 1,
                    code: "ADM-01".to_string(),
                    title: "Correspondence".to_string(),
                    retention_text: "5 years active + 10 years storage".to_string(),
                },
            )
        })
        .unwrap();
        db
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_fields(period_from: &str, period_to: Option<&str>) -> RecordFields {
        RecordFields {
            title: "Board minutes".to_string(),
            description: None,
            classification_id: 1,
            office_id: 1,
            period_from: date(period_from),
            period_to: period_to.map(date),
            active_years: 5,
            storage_years: 10,
            total_years: 15,
            time_value: TimeValue::Temporary,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        db.with_conn(|conn| {
            let fields = sample_fields("2020-01-15", Some("2025-01-15"));
            let id = insert(conn, &fields, RecordStatus::Active, 7, NOW)?;

            let found = find_by_id(conn, id)?.expect("record should exist");
            assert_eq!(found.fields, fields);
            assert_eq!(found.status, RecordStatus::Active);
            assert_eq!(found.created_by, 7);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        let found = db.with_conn(|conn| find_by_id(conn, 404)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_update_status_is_compare_and_set() {
        let db = test_db();
        db.with_conn(|conn| {
            let id = insert(
                conn,
                &sample_fields("2020-01-15", Some("2025-01-15")),
                RecordStatus::Active,
                0,
                NOW,
            )?;

            let changed = update_status(
                conn,
                id,
                &[RecordStatus::Active, RecordStatus::Inactive],
                RecordStatus::Archived,
                NOW,
            )?;
            assert_eq!(changed, 1);

            // Second attempt finds the row no longer in a source state.
            let changed = update_status(
                conn,
                id,
                &[RecordStatus::Active, RecordStatus::Inactive],
                RecordStatus::Archived,
                NOW,
            )?;
            assert_eq!(changed, 0);
            assert_eq!(count_by_status(conn, RecordStatus::Archived)?, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_due_for_archival() {
        let db = test_db();
        db.with_conn(|conn| {
            let due = insert(
                conn,
                &sample_fields("2020-01-15", Some("2025-01-15")),
                RecordStatus::Active,
                0,
                NOW,
            )?;
            let due_inactive = insert(
                conn,
                &sample_fields("2019-03-01", Some("2024-03-01")),
                RecordStatus::Inactive,
                0,
                NOW,
            )?;
            insert(
                conn,
                &sample_fields("2024-01-15", Some("2029-01-15")),
                RecordStatus::Active,
                0,
                NOW,
            )?;
            insert(
                conn,
                &sample_fields("2010-01-01", Some("2015-01-01")),
                RecordStatus::Archived,
                0,
                NOW,
            )?;
            let mut permanent = sample_fields("2000-01-01", None);
            permanent.time_value = TimeValue::Permanent;
            insert(conn, &permanent, RecordStatus::Active, 0, NOW)?;

            let rows = list_due_for_archival(conn, date("2025-01-15"))?;
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![due, due_inactive]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_fields() {
        let db = test_db();
        db.with_conn(|conn| {
            let id = insert(
                conn,
                &sample_fields("2020-01-15", Some("2025-01-15")),
                RecordStatus::Active,
                0,
                NOW,
            )?;
            let mut fields = sample_fields("2021-06-30", Some("2026-06-30"));
            fields.title = "Revised minutes".to_string();
            assert_eq!(update_fields(conn, id, &fields, "2026-02-01T00:00:00Z")?, 1);

            let found = find_by_id(conn, id)?.unwrap();
            assert_eq!(found.fields.title, "Revised minutes");
            assert_eq!(found.fields.period_to, Some(date("2026-06-30")));
            assert_eq!(found.updated_at, "2026-02-01T00:00:00Z");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_by_status() {
        let db = test_db();
        db.with_conn(|conn| {
            insert(conn, &sample_fields("2020-01-15", None), RecordStatus::Active, 0, NOW)?;
            let archived =
                insert(conn, &sample_fields("2020-01-15", None), RecordStatus::Archived, 0, NOW)?;

            let rows = list_by_status(conn, RecordStatus::Archived)?;
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, archived);
            Ok(())
        })
        .unwrap();
    }
}
