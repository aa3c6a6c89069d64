//! The lifecycle engine: one handle bundling the database with the
//! settings every workflow operation needs.

use chrono::NaiveDate;
use tracing::{error, info_span};

use crate::actor::Actor;
use crate::audit::{ActionType, DisposalActionLog, RecordHistory};
use crate::config::Config;
use crate::db::audit_repo::{self, ActionFilter};
use crate::db::record_repo::RecordRow;
use crate::db::request_repo::DisposalRequestRow;
use crate::db::{lookup_repo, request_repo, Database};
use crate::disposal::workflow::{self, DecisionOutcome};
use crate::disposal::{DisposalDecision, NewDisposalRequest, DEFAULT_REJECT_REMARKS_MIN_LEN};
use crate::error::{ErrorKind, LifecycleError};
use crate::lifecycle::{sweep, SweepReport};
use crate::records::{self, NewRecord, RecordEdit};
use crate::retention::BareYearsPolicy;

/// Tunables for the lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub reject_remarks_min_len: usize,
    pub bare_years_policy: BareYearsPolicy,
    /// Whether `run_sweep` also moves Active records past their total
    /// retention to Scheduled for Disposal.
    pub schedule_disposals: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reject_remarks_min_len: DEFAULT_REJECT_REMARKS_MIN_LEN,
            bare_years_policy: BareYearsPolicy::default(),
            schedule_disposals: true,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            reject_remarks_min_len: config.disposal.reject_remarks_min_len,
            bare_years_policy: config.retention.bare_years_policy,
            schedule_disposals: config.sweep.schedule_disposals,
        }
    }
}

/// Record lifecycle operations over one database.
#[derive(Clone)]
pub struct LifecycleEngine {
    db: Database,
    settings: EngineSettings,
}

impl LifecycleEngine {
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        Self { db, settings }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Looks up who is acting. Id 0 is the system actor.
    pub fn resolve_actor(&self, user_id: i64) -> Result<Actor, LifecycleError> {
        let actor = self
            .db
            .with_conn(|conn| lookup_repo::resolve_actor(conn, user_id))
            .map_err(LifecycleError::from);
        match logged(actor)? {
            Some(actor) => Ok(actor),
            None => Err(LifecycleError::validation(format!(
                "Unknown user {}",
                user_id
            ))),
        }
    }

    pub fn create_record(
        &self,
        input: &NewRecord,
        actor: &Actor,
    ) -> Result<RecordRow, LifecycleError> {
        logged(records::create_record(
            &self.db,
            input,
            actor,
            self.settings.bare_years_policy,
        ))
    }

    /// Edits a record; `today` is the date the archival guard is checked against.
    pub fn edit_record(
        &self,
        record_id: i64,
        edit: &RecordEdit,
        actor: &Actor,
        reason: Option<&str>,
        today: NaiveDate,
    ) -> Result<RecordRow, LifecycleError> {
        logged(records::edit_record(
            &self.db,
            record_id,
            edit,
            actor,
            reason,
            self.settings.bare_years_policy,
            today,
        ))
    }

    pub fn create_disposal_request(
        &self,
        input: &NewDisposalRequest,
        actor: &Actor,
    ) -> Result<DisposalRequestRow, LifecycleError> {
        logged(workflow::create_disposal_request(&self.db, input, actor))
    }

    pub fn decide_disposal_request(
        &self,
        request_id: i64,
        decision: &DisposalDecision,
        actor: &Actor,
    ) -> Result<DecisionOutcome, LifecycleError> {
        logged(workflow::decide_disposal_request(
            &self.db,
            request_id,
            decision,
            actor,
            self.settings.reject_remarks_min_len,
        ))
    }

    pub fn evaluate_due_archival(&self, today: NaiveDate) -> Result<SweepReport, LifecycleError> {
        logged(sweep::evaluate_due_archival(&self.db, today))
    }

    pub fn evaluate_due_disposal_scheduling(
        &self,
        today: NaiveDate,
    ) -> Result<SweepReport, LifecycleError> {
        logged(sweep::evaluate_due_disposal_scheduling(&self.db, today))
    }

    /// Runs archival, then disposal scheduling when enabled.
    pub fn run_sweep(&self, today: NaiveDate) -> Result<SweepReport, LifecycleError> {
        let _span = info_span!("sweep.run", today = %today).entered();

        let mut report = self.evaluate_due_archival(today)?;
        if self.settings.schedule_disposals {
            report.merge(self.evaluate_due_disposal_scheduling(today)?);
        }
        Ok(report)
    }

    /// All audit entries for a record, oldest first.
    pub fn record_history(&self, record_id: i64) -> Result<RecordHistory, LifecycleError> {
        let history = self
            .db
            .with_conn(|conn| {
                let actions = audit_repo::query_actions(
                    conn,
                    &ActionFilter {
                        record_id: Some(record_id),
                        ..Default::default()
                    },
                )?;
                let field_changes = audit_repo::list_field_changes(conn, record_id)?;
                Ok(RecordHistory {
                    actions,
                    field_changes,
                })
            })
            .map_err(LifecycleError::from);
        logged(history)
    }

    /// Disposal-action entries tied to a request, oldest first.
    pub fn request_history(
        &self,
        request_id: i64,
    ) -> Result<Vec<DisposalActionLog>, LifecycleError> {
        let actions = self
            .db
            .with_conn(|conn| {
                audit_repo::query_actions(
                    conn,
                    &ActionFilter {
                        request_id: Some(request_id),
                        ..Default::default()
                    },
                )
            })
            .map_err(LifecycleError::from);
        logged(actions)
    }

    pub fn find_request(
        &self,
        request_id: i64,
    ) -> Result<Option<DisposalRequestRow>, LifecycleError> {
        let request = self
            .db
            .with_conn(|conn| request_repo::find_by_id(conn, request_id))
            .map_err(LifecycleError::from);
        logged(request)
    }

    pub fn count_actions(&self, action_type: ActionType) -> Result<u64, LifecycleError> {
        let count = self
            .db
            .with_conn(|conn| audit_repo::count_actions(conn, action_type.as_str()))
            .map_err(LifecycleError::from);
        logged(count)
    }
}

/// Logs persistence failures before they reach the caller. Validation and
/// conflict errors are the caller's to report.
fn logged<T>(result: Result<T, LifecycleError>) -> Result<T, LifecycleError> {
    if let Err(e) = &result {
        if e.kind() == ErrorKind::Persistence {
            error!("Lifecycle operation failed: {}", e);
        }
    }
    result
}
