//! Audit logger operations.

use chrono::Utc;
use rusqlite::Connection;

use super::fields::{classify_field, FieldMap, FieldType, FieldValue};
use super::DisposalActionEntry;
use crate::actor::Actor;
use crate::db::audit_repo::{self, FieldChangeColumns};
use crate::db::DatabaseError;

/// Appends a disposal-action entry and returns its id.
pub fn log_disposal_action(
    conn: &Connection,
    entry: &DisposalActionEntry,
) -> Result<i64, DatabaseError> {
    let id = audit_repo::insert_disposal_action(conn, entry, &Utc::now().to_rfc3339())?;
    log::debug!(
        "Audit {} (request {:?}, record {:?}) by actor {}",
        entry.action_type,
        entry.request_id,
        entry.record_id,
        entry.performed_by
    );
    Ok(id)
}

/// Appends one typed field-change entry.
///
/// The column family is chosen by [`classify_field`]. A value that cannot
/// be converted to its field's type is kept in the text columns instead.
pub fn log_field_change(
    conn: &Connection,
    record_id: i64,
    actor: &Actor,
    field: &str,
    old_value: &FieldValue,
    new_value: &FieldValue,
    reason: Option<&str>,
) -> Result<i64, DatabaseError> {
    let declared = classify_field(field);
    let (field_type, columns) = match typed_columns(declared, old_value, new_value) {
        Some(columns) => (declared, columns),
        None => {
            log::warn!(
                "Field '{}' change does not fit its {} column; storing as text",
                field,
                declared
            );
            (FieldType::Text, text_columns(old_value, new_value))
        }
    };

    audit_repo::insert_field_change(
        conn,
        record_id,
        actor.id,
        field,
        field_type,
        &columns,
        reason,
        &Utc::now().to_rfc3339(),
    )
}

/// Diffs two snapshots and logs one field change per differing field.
///
/// A field missing from one side counts as null. Returns the number of
/// entries written.
pub fn log_record_changes(
    conn: &Connection,
    record_id: i64,
    actor: &Actor,
    old_snapshot: &FieldMap,
    new_snapshot: &FieldMap,
    reason: Option<&str>,
) -> Result<usize, DatabaseError> {
    let mut names: Vec<&'static str> = old_snapshot
        .keys()
        .chain(new_snapshot.keys())
        .copied()
        .collect();
    names.sort_unstable();
    names.dedup();

    let mut written = 0;
    for name in names {
        let old_value = old_snapshot.get(name).unwrap_or(&FieldValue::Null);
        let new_value = new_snapshot.get(name).unwrap_or(&FieldValue::Null);
        if old_value == new_value {
            continue;
        }
        log_field_change(conn, record_id, actor, name, old_value, new_value, reason)?;
        written += 1;
    }
    Ok(written)
}

fn typed_columns(
    field_type: FieldType,
    old_value: &FieldValue,
    new_value: &FieldValue,
) -> Option<FieldChangeColumns> {
    match field_type {
        FieldType::Text | FieldType::Enum => Some(text_columns(old_value, new_value)),
        FieldType::Number => Some(FieldChangeColumns {
            old_number: convert(old_value, FieldValue::as_i64)?,
            new_number: convert(new_value, FieldValue::as_i64)?,
            ..Default::default()
        }),
        FieldType::ForeignKey => Some(FieldChangeColumns {
            old_fk: convert(old_value, FieldValue::as_i64)?,
            new_fk: convert(new_value, FieldValue::as_i64)?,
            ..Default::default()
        }),
        FieldType::Date => Some(FieldChangeColumns {
            old_date: convert(old_value, FieldValue::as_date)?,
            new_date: convert(new_value, FieldValue::as_date)?,
            ..Default::default()
        }),
    }
}

/// `Some(None)` for null, `Some(Some(v))` on success, `None` when the
/// value does not convert.
fn convert<T>(value: &FieldValue, f: impl Fn(&FieldValue) -> Option<T>) -> Option<Option<T>> {
    if value.is_null() {
        Some(None)
    } else {
        f(value).map(Some)
    }
}

fn text_columns(old_value: &FieldValue, new_value: &FieldValue) -> FieldChangeColumns {
    FieldChangeColumns {
        old_text: old_value.as_text(),
        new_text: new_value.as_text(),
        ..Default::default()
    }
}
