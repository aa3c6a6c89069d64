//! The transition table and the guarded, audited status write.

use chrono::Utc;
use rusqlite::Connection;

use super::status::RecordStatus;
use crate::actor::Actor;
use crate::audit::{self, ActionType, DisposalActionEntry, FieldValue};
use crate::db::record_repo;
use crate::error::LifecycleError;

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Date-driven sweep job.
    Sweep,
    /// A user editing the record.
    ManualEdit,
    /// The record was put into a new disposal request.
    RequestCreate,
    /// Its disposal request was approved.
    RequestApprove,
    /// Its disposal request was rejected.
    RequestReject,
}

/// Returns whether `from -> to` is in the transition table for `trigger`.
pub fn is_allowed(from: RecordStatus, to: RecordStatus, trigger: Trigger) -> bool {
    use RecordStatus::*;
    use Trigger::*;

    matches!(
        (from, to, trigger),
        (Active | Inactive, Archived, Sweep | ManualEdit)
            | (Active, ScheduledForDisposal, Sweep)
            | (Active, Inactive, ManualEdit)
            | (Inactive, Active, ManualEdit)
            | (Archived, ScheduledForDisposal, RequestCreate)
            | (ScheduledForDisposal, Disposed, RequestApprove)
            | (ScheduledForDisposal, Archived, RequestReject)
    )
}

/// Fails with a validation error when `from -> to` is not in the table.
pub fn validate_transition(
    from: RecordStatus,
    to: RecordStatus,
    trigger: Trigger,
) -> Result<(), LifecycleError> {
    if is_allowed(from, to, trigger) {
        Ok(())
    } else {
        Err(LifecycleError::validation(format!(
            "Cannot change record status from '{}' to '{}'",
            from, to
        )))
    }
}

/// Audit details attached to one record transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionAudit<'a> {
    /// Disposal-action entry to write for this record, if any.
    pub action: Option<ActionType>,
    pub request_id: Option<i64>,
    pub notes: Option<&'a str>,
    /// Reason stored on the `status` field-change entry.
    pub reason: Option<&'a str>,
}

/// Result of attempting one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status was written and audited.
    Applied { from: RecordStatus },
    /// The record was no longer in a source state; nothing was written.
    Stale,
}

/// Moves a record to `to`, writing its audit entries on the same connection.
///
/// The status write is a compare-and-set against `expected_from`, so a
/// concurrent writer that got there first turns this call into
/// [`TransitionOutcome::Stale`] instead of a second transition. Callers
/// run this inside a transaction so the status write and its audit
/// entries commit or roll back together.
pub fn apply_transition(
    conn: &Connection,
    record_id: i64,
    expected_from: RecordStatus,
    to: RecordStatus,
    trigger: Trigger,
    actor: &Actor,
    details: &TransitionAudit<'_>,
) -> Result<TransitionOutcome, LifecycleError> {
    validate_transition(expected_from, to, trigger)?;

    let now = Utc::now().to_rfc3339();
    let changed = record_repo::update_status(conn, record_id, &[expected_from], to, &now)?;
    if changed == 0 {
        return Ok(TransitionOutcome::Stale);
    }

    if let Some(action_type) = details.action {
        let mut entry = DisposalActionEntry::new(action_type, actor)
            .record(record_id)
            .transition(expected_from, to);
        if let Some(request_id) = details.request_id {
            entry = entry.request(request_id);
        }
        if let Some(notes) = details.notes {
            entry = entry.notes(notes);
        }
        audit::log_disposal_action(conn, &entry)?;
    }

    audit::log_field_change(
        conn,
        record_id,
        actor,
        "status",
        &FieldValue::from(expected_from.as_str()),
        &FieldValue::from(to.as_str()),
        details.reason,
    )?;

    Ok(TransitionOutcome::Applied {
        from: expected_from,
    })
}
