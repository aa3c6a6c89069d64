//! Disposal request repository: `disposal_requests` and its detail rows.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::record_repo::{date_to_sql, parse_text_column};
use super::DatabaseError;
use crate::disposal::{AgencyInfo, RequestStatus};

/// A disposal request row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct DisposalRequestRow {
    pub id: i64,
    pub agency: AgencyInfo,
    pub request_date: NaiveDate,
    pub compliance_notes: Option<String>,
    pub status: RequestStatus,
    pub remarks: Option<String>,
    pub requested_by: i64,
    pub decided_by: Option<i64>,
    pub decided_at: Option<String>,
    pub created_at: String,
}

impl DisposalRequestRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            agency: AgencyInfo {
                name: row.get("agency_name")?,
                address: row.get("agency_address")?,
                contact_person: row.get("contact_person")?,
            },
            request_date: parse_text_column(row, "request_date")?,
            compliance_notes: row.get("compliance_notes")?,
            status: parse_text_column(row, "status")?,
            remarks: row.get("remarks")?,
            requested_by: row.get("requested_by")?,
            decided_by: row.get("decided_by")?,
            decided_at: row.get("decided_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new Pending request and returns its id.
pub fn insert(
    conn: &Connection,
    agency: &AgencyInfo,
    request_date: NaiveDate,
    compliance_notes: Option<&str>,
    requested_by: i64,
    now: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO disposal_requests (agency_name, agency_address, contact_person,
         request_date, compliance_notes, status, requested_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            agency.name,
            agency.address,
            agency.contact_person,
            date_to_sql(request_date),
            compliance_notes,
            RequestStatus::Pending.as_str(),
            requested_by,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a request by its id.
pub fn find_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<DisposalRequestRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM disposal_requests WHERE id = ?1",
            params![id],
            DisposalRequestRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists requests in `status`, newest first.
pub fn list_by_status(
    conn: &Connection,
    status: RequestStatus,
) -> Result<Vec<DisposalRequestRow>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM disposal_requests WHERE status = ?1 ORDER BY id DESC")?;
    let rows = stmt
        .query_map(params![status.as_str()], DisposalRequestRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Attaches a record to a request as an open detail row.
///
/// Fails with a constraint violation when the record already sits in
/// another open request.
pub fn insert_detail(
    conn: &Connection,
    request_id: i64,
    record_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO disposal_request_details (request_id, record_id, is_open) VALUES (?1, ?2, 1)",
        params![request_id, record_id],
    )?;
    Ok(())
}

/// Record ids attached to a request, ascending.
pub fn list_record_ids(conn: &Connection, request_id: i64) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT record_id FROM disposal_request_details WHERE request_id = ?1 ORDER BY record_id",
    )?;
    let ids = stmt
        .query_map(params![request_id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// The open (Pending or Approved) request a record belongs to, if any.
pub fn find_open_request_for_record(
    conn: &Connection,
    record_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT request_id FROM disposal_request_details WHERE record_id = ?1 AND is_open = 1",
            params![record_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id)
}

/// Records the decision on a request, only if it is still Pending.
///
/// Returns the number of rows changed (0 or 1).
pub fn update_decision(
    conn: &Connection,
    id: i64,
    status: RequestStatus,
    remarks: Option<&str>,
    decided_by: i64,
    now: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE disposal_requests SET status = ?2, remarks = COALESCE(?3, remarks),
         decided_by = ?4, decided_at = ?5
         WHERE id = ?1 AND status = ?6",
        params![
            id,
            status.as_str(),
            remarks,
            decided_by,
            now,
            RequestStatus::Pending.as_str(),
        ],
    )?;
    Ok(changed)
}

/// Releases every record of a request so it can join a new one.
pub fn close_details(conn: &Connection, request_id: i64) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE disposal_request_details SET is_open = 0 WHERE request_id = ?1",
        params![request_id],
    )?;
    Ok(changed)
}
