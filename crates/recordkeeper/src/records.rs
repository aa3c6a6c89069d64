//! Record maintenance: create and edit with fixed, validated input structs.
//!
//! Retention years, `time_value` and `period_to` are never taken from the
//! caller. They are derived from the classification's retention text so
//! `total_years = active_years + storage_years` and
//! `period_to = period_from + active_years` hold after every save.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{info, info_span, warn};

use crate::actor::Actor;
use crate::audit::{self, ActionType, DisposalActionEntry, FieldMap, FieldValue};
use crate::db::record_repo::{self, RecordFields, RecordRow};
use crate::db::{lookup_repo, request_repo, Database};
use crate::error::LifecycleError;
use crate::lifecycle::{
    apply_transition, validate_transition, RecordStatus, TimeValue, TransitionAudit,
    TransitionOutcome, Trigger,
};
use crate::retention::{self, BareYearsPolicy, RetentionYears};

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub title: String,
    pub description: Option<String>,
    pub classification_id: i64,
    pub office_id: i64,
    pub period_from: NaiveDate,
}

/// Input for editing a record. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordEdit {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub classification_id: Option<i64>,
    pub office_id: Option<i64>,
    pub period_from: Option<NaiveDate>,
    pub status: Option<RecordStatus>,
}

/// Retention-derived attributes for one classification and start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedRetention {
    pub years: RetentionYears,
    pub time_value: TimeValue,
    pub period_to: Option<NaiveDate>,
}

/// Derives retention attributes from a classification's retention text.
pub fn derive_retention(
    conn: &Connection,
    classification_id: i64,
    period_from: NaiveDate,
    policy: BareYearsPolicy,
) -> Result<DerivedRetention, LifecycleError> {
    let text = lookup_repo::retention_text(conn, classification_id)?.ok_or(
        LifecycleError::NotFound {
            entity: "Classification",
            id: classification_id,
        },
    )?;

    let parsed = retention::parse_retention(&text, policy);
    if parsed.is_unparsed() {
        warn!(
            classification_id,
            retention_text = %text,
            "Retention text could not be interpreted; flagged for review"
        );
        return Err(LifecycleError::validation(format!(
            "Retention period '{}' of classification {} could not be interpreted and needs review",
            text, classification_id
        )));
    }

    let years = parsed.years;
    if years.permanent {
        return Ok(DerivedRetention {
            years,
            time_value: TimeValue::Permanent,
            period_to: None,
        });
    }
    if years.is_empty() {
        return Err(LifecycleError::validation("Retention required"));
    }

    let period_to = retention::end_date(period_from, &years).ok_or_else(|| {
        LifecycleError::validation(format!(
            "Retention of {} years from {} is out of range",
            years.active, period_from
        ))
    })?;

    Ok(DerivedRetention {
        years,
        time_value: TimeValue::Temporary,
        period_to: Some(period_to),
    })
}

/// Field snapshot used for change logging. Status is excluded; status
/// changes are logged by the transition itself.
pub fn snapshot(fields: &RecordFields) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert("title", FieldValue::from(fields.title.as_str()));
    map.insert("description", FieldValue::from(fields.description.clone()));
    map.insert("classification_id", FieldValue::from(fields.classification_id));
    map.insert("office_id", FieldValue::from(fields.office_id));
    map.insert("period_from", FieldValue::from(fields.period_from));
    map.insert("period_to", FieldValue::from(fields.period_to));
    map.insert("active_years", FieldValue::from(fields.active_years));
    map.insert("storage_years", FieldValue::from(fields.storage_years));
    map.insert("total_years", FieldValue::from(fields.total_years));
    map.insert("time_value", FieldValue::from(fields.time_value.as_str()));
    map
}

fn build_fields(
    title: String,
    description: Option<String>,
    classification_id: i64,
    office_id: i64,
    period_from: NaiveDate,
    derived: DerivedRetention,
) -> RecordFields {
    RecordFields {
        title,
        description,
        classification_id,
        office_id,
        period_from,
        period_to: derived.period_to,
        active_years: derived.years.active,
        storage_years: derived.years.storage,
        total_years: derived.years.total,
        time_value: derived.time_value,
    }
}

fn validate_title(title: &str) -> Result<String, LifecycleError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LifecycleError::validation("Record title is required"));
    }
    Ok(title.to_string())
}

fn require_office(conn: &Connection, office_id: i64) -> Result<(), LifecycleError> {
    if lookup_repo::office_exists(conn, office_id)? {
        Ok(())
    } else {
        Err(LifecycleError::NotFound {
            entity: "Office",
            id: office_id,
        })
    }
}

/// Creates a record in the Active state.
pub fn create_record(
    db: &Database,
    input: &NewRecord,
    actor: &Actor,
    policy: BareYearsPolicy,
) -> Result<RecordRow, LifecycleError> {
    let _span = info_span!("record.create", actor = actor.id).entered();

    let title = validate_title(&input.title)?;

    let record = db.with_transaction(|tx| {
        require_office(tx, input.office_id)?;
        let derived = derive_retention(tx, input.classification_id, input.period_from, policy)?;
        let fields = build_fields(
            title,
            input.description.clone(),
            input.classification_id,
            input.office_id,
            input.period_from,
            derived,
        );

        let now = Utc::now().to_rfc3339();
        let id = record_repo::insert(tx, &fields, RecordStatus::Active, actor.id, &now)?;

        let mut entry = DisposalActionEntry::new(ActionType::SystemLog, actor)
            .record(id)
            .notes(format!(
                "Record created ({} retention, {} active + {} storage years)",
                fields.time_value, fields.active_years, fields.storage_years
            ));
        entry.status_to = Some(RecordStatus::Active.to_string());
        audit::log_disposal_action(tx, &entry)?;

        record_repo::find_by_id(tx, id)?.ok_or(LifecycleError::NotFound {
            entity: "Record",
            id,
        })
    })?;

    info!(record_id = record.id, "Record created");
    Ok(record)
}

/// Edits a record, logging one typed field change per changed field.
///
/// A status change must be a manual transition from the table; moving to
/// Archived additionally requires `period_to <= today`. Disposed records
/// and records held by an open disposal request cannot be edited.
pub fn edit_record(
    db: &Database,
    record_id: i64,
    edit: &RecordEdit,
    actor: &Actor,
    reason: Option<&str>,
    policy: BareYearsPolicy,
    today: NaiveDate,
) -> Result<RecordRow, LifecycleError> {
    let _span = info_span!("record.edit", record_id, actor = actor.id).entered();

    let title = edit.title.as_deref().map(validate_title).transpose()?;

    let record = db.with_transaction(|tx| {
        let current = record_repo::find_by_id(tx, record_id)?.ok_or(LifecycleError::NotFound {
            entity: "Record",
            id: record_id,
        })?;

        if current.status.is_terminal() {
            return Err(LifecycleError::conflict(format!(
                "Record {} is {} and can no longer be edited",
                record_id, current.status
            )));
        }
        if let Some(request_id) = request_repo::find_open_request_for_record(tx, record_id)? {
            return Err(LifecycleError::conflict(format!(
                "Record {} is held by open disposal request #{}",
                record_id, request_id
            )));
        }

        let old = &current.fields;
        let classification_id = edit.classification_id.unwrap_or(old.classification_id);
        let office_id = edit.office_id.unwrap_or(old.office_id);
        let period_from = edit.period_from.unwrap_or(old.period_from);
        if office_id != old.office_id {
            require_office(tx, office_id)?;
        }

        let retention_changed =
            classification_id != old.classification_id || period_from != old.period_from;
        let derived = if retention_changed {
            derive_retention(tx, classification_id, period_from, policy)?
        } else {
            DerivedRetention {
                years: RetentionYears {
                    active: old.active_years,
                    storage: old.storage_years,
                    total: old.total_years,
                    permanent: old.time_value == TimeValue::Permanent,
                },
                time_value: old.time_value,
                period_to: old.period_to,
            }
        };

        let fields = build_fields(
            title.clone().unwrap_or_else(|| old.title.clone()),
            edit.description.clone().unwrap_or_else(|| old.description.clone()),
            classification_id,
            office_id,
            period_from,
            derived,
        );

        let target_status = edit.status.filter(|s| *s != current.status);
        if let Some(to) = target_status {
            validate_transition(current.status, to, Trigger::ManualEdit)?;
            if to == RecordStatus::Archived && !fields.period_to.is_some_and(|d| d <= today) {
                return Err(LifecycleError::validation(format!(
                    "Record {} is not yet due for archival",
                    record_id
                )));
            }
        }

        let now = Utc::now().to_rfc3339();
        if fields != *old {
            record_repo::update_fields(tx, record_id, &fields, &now)?;
            audit::log_record_changes(
                tx,
                record_id,
                actor,
                &snapshot(old),
                &snapshot(&fields),
                reason,
            )?;
        }

        if let Some(to) = target_status {
            let action = (to == RecordStatus::Archived).then_some(ActionType::ArchiveComplete);
            let outcome = apply_transition(
                tx,
                record_id,
                current.status,
                to,
                Trigger::ManualEdit,
                actor,
                &TransitionAudit {
                    action,
                    notes: reason,
                    reason,
                    ..Default::default()
                },
            )?;
            if outcome == TransitionOutcome::Stale {
                return Err(LifecycleError::conflict(format!(
                    "Record {} changed while it was being edited",
                    record_id
                )));
            }
        }

        record_repo::find_by_id(tx, record_id)?.ok_or(LifecycleError::NotFound {
            entity: "Record",
            id: record_id,
        })
    })?;

    info!(record_id, status = %record.status, "Record edited");
    Ok(record)
}
