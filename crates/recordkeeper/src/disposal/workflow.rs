//! Transactional create and decide operations.
//!
//! Each operation is one `IMMEDIATE` transaction: every precondition is
//! checked under the write lock, and any failure rolls back the request,
//! its detail rows, every record status and every audit entry together.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, info_span};

use super::{Decision, DisposalDecision, NewDisposalRequest, RequestStatus};
use crate::actor::Actor;
use crate::audit::{self, ActionType, DisposalActionEntry};
use crate::db::request_repo::{self, DisposalRequestRow};
use crate::db::{record_repo, Database};
use crate::error::LifecycleError;
use crate::lifecycle::{
    apply_transition, RecordStatus, TransitionAudit, TransitionOutcome, Trigger,
};

/// Result of a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub request: DisposalRequestRow,
    /// Records moved by the decision, ascending.
    pub record_ids: Vec<i64>,
}

/// Creates a Pending request for a set of Archived records.
///
/// Every record must be Archived and outside any open request. The check
/// runs inside the same transaction that inserts the detail rows, and the
/// partial unique index on open detail rows backs it at commit.
pub fn create_disposal_request(
    db: &Database,
    input: &NewDisposalRequest,
    actor: &Actor,
) -> Result<DisposalRequestRow, LifecycleError> {
    let _span = info_span!(
        "disposal.create",
        actor = actor.id,
        records = input.record_ids.len()
    )
    .entered();

    validate_new_request(input)?;

    let request = db.with_transaction(|tx| {
        for &record_id in &input.record_ids {
            check_record_available(tx, record_id)?;
        }

        let now = Utc::now().to_rfc3339();
        let request_id = request_repo::insert(
            tx,
            &input.agency,
            input.request_date,
            input.compliance_notes.as_deref(),
            actor.id,
            &now,
        )?;

        let reason = format!("Added to disposal request #{}", request_id);
        for &record_id in &input.record_ids {
            request_repo::insert_detail(tx, request_id, record_id).map_err(|e| {
                if e.is_constraint_violation() {
                    LifecycleError::conflict(format!(
                        "Record {} is already part of an open disposal request",
                        record_id
                    ))
                } else {
                    LifecycleError::from(e)
                }
            })?;

            let outcome = apply_transition(
                tx,
                record_id,
                RecordStatus::Archived,
                RecordStatus::ScheduledForDisposal,
                Trigger::RequestCreate,
                actor,
                &TransitionAudit {
                    request_id: Some(request_id),
                    reason: Some(reason.as_str()),
                    ..Default::default()
                },
            )?;
            if outcome == TransitionOutcome::Stale {
                return Err(LifecycleError::conflict(format!(
                    "Record {} is no longer Archived",
                    record_id
                )));
            }
        }

        let mut entry = DisposalActionEntry::new(ActionType::RequestCreate, actor)
            .request(request_id)
            .notes(format!(
                "Disposal request for {} record(s) submitted by {}",
                input.record_ids.len(),
                input.agency.name
            ));
        entry.status_to = Some(RequestStatus::Pending.to_string());
        audit::log_disposal_action(tx, &entry)?;

        request_repo::find_by_id(tx, request_id)?.ok_or(LifecycleError::NotFound {
            entity: "Disposal request",
            id: request_id,
        })
    })?;

    info!(request_id = request.id, "Disposal request created");
    Ok(request)
}

/// Applies an approve or reject decision to a Pending request.
///
/// Approve disposes every attached record; reject returns every attached
/// record to Archived and releases it for future requests. Rejection
/// requires remarks of at least `remarks_min_len` characters.
pub fn decide_disposal_request(
    db: &Database,
    request_id: i64,
    decision: &DisposalDecision,
    actor: &Actor,
    remarks_min_len: usize,
) -> Result<DecisionOutcome, LifecycleError> {
    let _span = info_span!(
        "disposal.decide",
        request_id,
        actor = actor.id,
        decision = ?decision.decision
    )
    .entered();

    let remarks = decision
        .remarks
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if decision.decision == Decision::Reject {
        match remarks {
            None => {
                return Err(LifecycleError::validation(
                    "Remarks are required when rejecting a disposal request",
                ))
            }
            Some(r) if r.chars().count() < remarks_min_len => {
                return Err(LifecycleError::validation(format!(
                    "Rejection remarks must be at least {} characters",
                    remarks_min_len
                )))
            }
            Some(_) => {}
        }
    }

    let target = decision.decision.resulting_status();

    let outcome = db.with_transaction(|tx| {
        let request = request_repo::find_by_id(tx, request_id)?.ok_or(LifecycleError::NotFound {
            entity: "Disposal request",
            id: request_id,
        })?;
        if request.status != RequestStatus::Pending {
            return Err(LifecycleError::conflict(format!(
                "Disposal request #{} is already {}",
                request_id, request.status
            )));
        }

        let now = Utc::now().to_rfc3339();
        let changed =
            request_repo::update_decision(tx, request_id, target, remarks, actor.id, &now)?;
        if changed == 0 {
            return Err(LifecycleError::conflict(format!(
                "Disposal request #{} is no longer Pending",
                request_id
            )));
        }

        let (request_action, record_action, record_target, trigger) = match decision.decision {
            Decision::Approve => (
                ActionType::RequestApprove,
                Some(ActionType::DisposalComplete),
                RecordStatus::Disposed,
                Trigger::RequestApprove,
            ),
            Decision::Reject => (
                ActionType::RequestReject,
                None,
                RecordStatus::Archived,
                Trigger::RequestReject,
            ),
        };

        let mut request_entry = DisposalActionEntry::new(request_action, actor)
            .request(request_id)
            .transition(RequestStatus::Pending, target);
        if let Some(r) = remarks {
            request_entry = request_entry.notes(r);
        }
        audit::log_disposal_action(tx, &request_entry)?;

        if decision.decision == Decision::Reject {
            request_repo::close_details(tx, request_id)?;
        }

        let default_reason = format!("Disposal request #{} {}", request_id, target);
        let reason = remarks.unwrap_or(default_reason.as_str());
        let record_ids = request_repo::list_record_ids(tx, request_id)?;
        for &record_id in &record_ids {
            transition_attached_record(
                tx,
                record_id,
                record_target,
                trigger,
                actor,
                &TransitionAudit {
                    action: record_action,
                    request_id: Some(request_id),
                    notes: Some(default_reason.as_str()),
                    reason: Some(reason),
                },
            )?;
        }

        let request = request_repo::find_by_id(tx, request_id)?.ok_or(LifecycleError::NotFound {
            entity: "Disposal request",
            id: request_id,
        })?;
        Ok(DecisionOutcome {
            request,
            record_ids,
        })
    })?;

    info!(
        request_id,
        status = %outcome.request.status,
        records = outcome.record_ids.len(),
        "Disposal request decided"
    );
    Ok(outcome)
}

fn validate_new_request(input: &NewDisposalRequest) -> Result<(), LifecycleError> {
    if input.record_ids.is_empty() {
        return Err(LifecycleError::validation(
            "Select at least one archived record for the disposal request",
        ));
    }
    if input.agency.name.trim().is_empty() {
        return Err(LifecycleError::validation("Agency name is required"));
    }
    let mut seen = HashSet::new();
    for &record_id in &input.record_ids {
        if !seen.insert(record_id) {
            return Err(LifecycleError::validation(format!(
                "Record {} is listed more than once",
                record_id
            )));
        }
    }
    Ok(())
}

/// Checks that a record can join a new request. Runs inside the
/// creating transaction.
fn check_record_available(conn: &Connection, record_id: i64) -> Result<(), LifecycleError> {
    let record = record_repo::find_by_id(conn, record_id)?.ok_or(LifecycleError::NotFound {
        entity: "Record",
        id: record_id,
    })?;

    if let Some(open_request) = request_repo::find_open_request_for_record(conn, record_id)? {
        return Err(LifecycleError::conflict(format!(
            "Record {} is already part of open disposal request #{}",
            record_id, open_request
        )));
    }
    if record.status != RecordStatus::Archived {
        return Err(LifecycleError::conflict(format!(
            "Record {} is no longer Archived (current status: {})",
            record_id, record.status
        )));
    }
    Ok(())
}

fn transition_attached_record(
    conn: &Connection,
    record_id: i64,
    to: RecordStatus,
    trigger: Trigger,
    actor: &Actor,
    details: &TransitionAudit<'_>,
) -> Result<(), LifecycleError> {
    let outcome = apply_transition(
        conn,
        record_id,
        RecordStatus::ScheduledForDisposal,
        to,
        trigger,
        actor,
        details,
    )?;
    match outcome {
        TransitionOutcome::Applied { .. } => Ok(()),
        TransitionOutcome::Stale => Err(LifecycleError::conflict(format!(
            "Record {} is no longer Scheduled for Disposal",
            record_id
        ))),
    }
}
