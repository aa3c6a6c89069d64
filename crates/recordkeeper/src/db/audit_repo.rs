//! Audit repository: inserts and queries for the two append-only log tables.
//!
//! There are deliberately no update or delete functions here; the tables
//! also carry triggers that abort any UPDATE or DELETE.

use rusqlite::{params, Connection, Row};

use super::record_repo::{date_to_sql, parse_text_column, parse_value};
use super::DatabaseError;
use crate::audit::{DisposalActionEntry, DisposalActionLog, FieldChangeLog, FieldType};

/// Typed old/new column values for one field-change row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldChangeColumns {
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub old_number: Option<i64>,
    pub new_number: Option<i64>,
    pub old_date: Option<chrono::NaiveDate>,
    pub new_date: Option<chrono::NaiveDate>,
    pub old_fk: Option<i64>,
    pub new_fk: Option<i64>,
}

/// Query filter parameters for disposal-action listing.
#[derive(Debug, Default, Clone)]
pub struct ActionFilter {
    pub action_type: Option<String>,
    pub record_id: Option<i64>,
    pub request_id: Option<i64>,
    pub performed_by: Option<i64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl DisposalActionLog {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            action_type: parse_text_column(row, "action_type")?,
            request_id: row.get("request_id")?,
            record_id: row.get("record_id")?,
            schedule_id: row.get("schedule_id")?,
            performed_by: row.get("performed_by")?,
            status_from: row.get("status_from")?,
            status_to: row.get("status_to")?,
            notes: row.get("notes")?,
            document: row.get("document")?,
            office_id: row.get("office_id")?,
            role_id: row.get("role_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl FieldChangeLog {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let old_date: Option<String> = row.get("old_value_date")?;
        let new_date: Option<String> = row.get("new_value_date")?;
        Ok(Self {
            id: row.get("id")?,
            record_id: row.get("record_id")?,
            changed_by: row.get("changed_by")?,
            field_name: row.get("field_name")?,
            field_type: parse_text_column(row, "field_type")?,
            old_value_text: row.get("old_value_text")?,
            new_value_text: row.get("new_value_text")?,
            old_value_number: row.get("old_value_number")?,
            new_value_number: row.get("new_value_number")?,
            old_value_date: old_date
                .map(|raw| parse_value("old_value_date", &raw))
                .transpose()?,
            new_value_date: new_date
                .map(|raw| parse_value("new_value_date", &raw))
                .transpose()?,
            old_value_fk: row.get("old_value_fk")?,
            new_value_fk: row.get("new_value_fk")?,
            change_reason: row.get("change_reason")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Appends a disposal-action row and returns its id.
pub fn insert_disposal_action(
    conn: &Connection,
    entry: &DisposalActionEntry,
    now: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO disposal_action_logs (request_id, record_id, schedule_id, action_type,
         performed_by, status_from, status_to, notes, document, office_id, role_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            entry.request_id,
            entry.record_id,
            entry.schedule_id,
            entry.action_type.as_str(),
            entry.performed_by,
            entry.status_from,
            entry.status_to,
            entry.notes,
            entry.document,
            entry.office_id,
            entry.role_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Appends a field-change row and returns its id.
#[allow(clippy::too_many_arguments)]
pub fn insert_field_change(
    conn: &Connection,
    record_id: i64,
    changed_by: i64,
    field_name: &str,
    field_type: FieldType,
    values: &FieldChangeColumns,
    change_reason: Option<&str>,
    now: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO field_change_logs (record_id, changed_by, field_name, field_type,
         old_value_text, new_value_text, old_value_number, new_value_number,
         old_value_date, new_value_date, old_value_fk, new_value_fk, change_reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            record_id,
            changed_by,
            field_name,
            field_type.as_str(),
            values.old_text,
            values.new_text,
            values.old_number,
            values.new_number,
            values.old_date.map(date_to_sql),
            values.new_date.map(date_to_sql),
            values.old_fk,
            values.new_fk,
            change_reason,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Queries disposal-action rows with filters, oldest first.
pub fn query_actions(
    conn: &Connection,
    filter: &ActionFilter,
) -> Result<Vec<DisposalActionLog>, DatabaseError> {
    let mut conditions = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref action_type) = filter.action_type {
        conditions.push(format!("action_type = ?{}", param_values.len() + 1));
        param_values.push(Box::new(action_type.clone()));
    }
    if let Some(record_id) = filter.record_id {
        conditions.push(format!("record_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(record_id));
    }
    if let Some(request_id) = filter.request_id {
        conditions.push(format!("request_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(request_id));
    }
    if let Some(performed_by) = filter.performed_by {
        conditions.push(format!("performed_by = ?{}", param_values.len() + 1));
        param_values.push(Box::new(performed_by));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
    let offset = filter.offset.unwrap_or(0) as i64;
    param_values.push(Box::new(limit));
    param_values.push(Box::new(offset));
    let sql = format!(
        "SELECT * FROM disposal_action_logs {} ORDER BY id ASC LIMIT ?{} OFFSET ?{}",
        where_clause,
        param_values.len() - 1,
        param_values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_ref.as_slice(), DisposalActionLog::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Lists the field-change rows of a record, oldest first.
pub fn list_field_changes(
    conn: &Connection,
    record_id: i64,
) -> Result<Vec<FieldChangeLog>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM field_change_logs WHERE record_id = ?1 ORDER BY id ASC")?;
    let rows = stmt
        .query_map(params![record_id], FieldChangeLog::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Counts disposal-action rows of one type.
pub fn count_actions(conn: &Connection, action_type: &str) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM disposal_action_logs WHERE action_type = ?1",
        params![action_type],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Counts field-change rows for one field name across all records.
pub fn count_field_changes(conn: &Connection, field_name: &str) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM field_change_logs WHERE field_name = ?1",
        params![field_name],
        |r| r.get(0),
    )?;
    Ok(count)
}
