//! Date-driven sweeps that advance record status without user interaction.
//!
//! A sweep reads its candidate list once, then processes each record in its
//! own transaction. One record failing is logged and skipped; the rest of
//! the sweep continues. Each record's guard is re-checked inside its
//! transaction, so overlapping sweeps never transition a record twice.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use super::status::{RecordStatus, TimeValue};
use super::transition::{apply_transition, TransitionAudit, TransitionOutcome, Trigger};
use crate::actor::Actor;
use crate::audit::ActionType;
use crate::db::record_repo::{self, RecordRow};
use crate::db::Database;
use crate::error::{ErrorKind, LifecycleError};
use crate::retention;

/// Reason recorded on sweep-driven archival.
pub const ARCHIVAL_REASON: &str = "Retention period expired";
/// Reason recorded on sweep-driven disposal scheduling.
pub const DISPOSAL_SCHEDULING_REASON: &str = "Total retention period expired";

/// A record the sweep could not process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub record_id: i64,
    pub message: String,
}

/// Outcome of one sweep operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Candidates read by the scan.
    pub examined: usize,
    /// Records moved to the target status by this run.
    pub transitioned: Vec<i64>,
    /// Records whose guard no longer held inside their transaction.
    pub skipped: Vec<i64>,
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    /// Folds another report into this one.
    pub fn merge(&mut self, other: SweepReport) {
        self.examined += other.examined;
        self.transitioned.extend(other.transitioned);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Whether a record is due for archival on `today`.
pub fn is_due_for_archival(record: &RecordRow, today: NaiveDate) -> bool {
    record.status.is_pre_archival()
        && record.fields.time_value == TimeValue::Temporary
        && record.fields.period_to.is_some_and(|to| to <= today)
}

/// Whether an Active record's total retention has run out on `today`.
pub fn is_due_for_disposal_scheduling(record: &RecordRow, today: NaiveDate) -> bool {
    record.status == RecordStatus::Active
        && record.fields.time_value == TimeValue::Temporary
        && record.fields.total_years > 0
        && retention::disposal_date(record.fields.period_from, record.fields.total_years)
            .is_some_and(|due| due <= today)
}

/// Archives every Active/Inactive record whose `period_to` is on or before `today`.
///
/// Each archived record gets one `ARCHIVE_COMPLETE` entry and one `status`
/// field change, attributed to the system actor. Re-running with no
/// intervening writes archives nothing and writes nothing.
pub fn evaluate_due_archival(
    db: &Database,
    today: NaiveDate,
) -> Result<SweepReport, LifecycleError> {
    let _span = info_span!("sweep.archival", today = %today).entered();

    let candidates = db.with_conn(|conn| record_repo::list_due_for_archival(conn, today))?;
    let report = process_candidates(
        db,
        candidates,
        RecordStatus::Archived,
        |record| is_due_for_archival(record, today),
        TransitionAudit {
            action: Some(ActionType::ArchiveComplete),
            notes: Some(ARCHIVAL_REASON),
            reason: Some(ARCHIVAL_REASON),
            ..Default::default()
        },
    );

    info!(
        archived = report.transitioned.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Archival sweep finished"
    );
    Ok(report)
}

/// Moves Active records whose `period_from + total_years` has passed to
/// Scheduled for Disposal, logging a `SCHEDULE_CREATE` entry for each.
pub fn evaluate_due_disposal_scheduling(
    db: &Database,
    today: NaiveDate,
) -> Result<SweepReport, LifecycleError> {
    let _span = info_span!("sweep.disposal_scheduling", today = %today).entered();

    let candidates: Vec<RecordRow> = db
        .with_conn(|conn| record_repo::list_disposal_candidates(conn, today))?
        .into_iter()
        .filter(|record| is_due_for_disposal_scheduling(record, today))
        .collect();

    let report = process_candidates(
        db,
        candidates,
        RecordStatus::ScheduledForDisposal,
        |record| is_due_for_disposal_scheduling(record, today),
        TransitionAudit {
            action: Some(ActionType::ScheduleCreate),
            notes: Some(DISPOSAL_SCHEDULING_REASON),
            reason: Some(DISPOSAL_SCHEDULING_REASON),
            ..Default::default()
        },
    );

    info!(
        scheduled = report.transitioned.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Disposal scheduling sweep finished"
    );
    Ok(report)
}

fn process_candidates<F>(
    db: &Database,
    candidates: Vec<RecordRow>,
    to: RecordStatus,
    still_due: F,
    details: TransitionAudit<'_>,
) -> SweepReport
where
    F: Fn(&RecordRow) -> bool,
{
    let system = Actor::system();
    let mut report = SweepReport {
        examined: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        let _record_span = info_span!("sweep.record", record_id = candidate.id).entered();

        let result = db.with_transaction(|tx| {
            // Re-read under the write lock; the scan may be stale.
            let current = match record_repo::find_by_id(tx, candidate.id)? {
                Some(record) if still_due(&record) => record,
                _ => return Ok(TransitionOutcome::Stale),
            };
            apply_transition(
                tx,
                current.id,
                current.status,
                to,
                Trigger::Sweep,
                &system,
                &details,
            )
        });

        match result {
            Ok(TransitionOutcome::Applied { from }) => {
                debug!("Record {} moved from '{}' to '{}'", candidate.id, from, to);
                report.transitioned.push(candidate.id);
            }
            Ok(TransitionOutcome::Stale) => {
                debug!("Record {} no longer due; skipped", candidate.id);
                report.skipped.push(candidate.id);
            }
            Err(e) => {
                if e.kind() == ErrorKind::Persistence {
                    error!("Sweep failed for record {}: {}", candidate.id, e);
                } else {
                    warn!("Sweep rejected record {}: {}", candidate.id, e);
                }
                report.failed.push(SweepFailure {
                    record_id: candidate.id,
                    message: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::record_repo::RecordFields;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn row(status: RecordStatus, time_value: TimeValue, period_to: Option<&str>) -> RecordRow {
        RecordRow {
            id: 1,
            fields: RecordFields {
                title: "Payroll".to_string(),
                description: None,
                classification_id: 1,
                office_id: 1,
                period_from: date("2020-01-15"),
                period_to: period_to.map(date),
                active_years: 5,
                storage_years: 10,
                total_years: 15,
                time_value,
            },
            status,
            created_by: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_archival_guard() {
        let today = date("2025-01-15");
        assert!(is_due_for_archival(
            &row(RecordStatus::Active, TimeValue::Temporary, Some("2025-01-15")),
            today
        ));
        assert!(is_due_for_archival(
            &row(RecordStatus::Inactive, TimeValue::Temporary, Some("2024-12-31")),
            today
        ));
        assert!(!is_due_for_archival(
            &row(RecordStatus::Active, TimeValue::Temporary, Some("2025-01-16")),
            today
        ));
        assert!(!is_due_for_archival(
            &row(RecordStatus::Active, TimeValue::Temporary, None),
            today
        ));
        assert!(!is_due_for_archival(
            &row(RecordStatus::Active, TimeValue::Permanent, Some("2000-01-01")),
            today
        ));
        assert!(!is_due_for_archival(
            &row(RecordStatus::Archived, TimeValue::Temporary, Some("2025-01-15")),
            today
        ));
    }

    #[test]
    fn test_disposal_scheduling_guard() {
        let record = row(RecordStatus::Active, TimeValue::Temporary, Some("2025-01-15"));
        assert!(!is_due_for_disposal_scheduling(&record, date("2035-01-14")));
        assert!(is_due_for_disposal_scheduling(&record, date("2035-01-15")));

        let inactive = row(RecordStatus::Inactive, TimeValue::Temporary, Some("2025-01-15"));
        assert!(!is_due_for_disposal_scheduling(&inactive, date("2040-01-01")));
    }

    #[test]
    fn test_report_merge() {
        let mut a = SweepReport {
            examined: 2,
            transitioned: vec![1],
            skipped: vec![2],
            failed: vec![],
        };
        a.merge(SweepReport {
            examined: 1,
            transitioned: vec![3],
            ..Default::default()
        });
        assert_eq!(a.examined, 3);
        assert_eq!(a.transitioned, vec![1, 3]);
    }
}
