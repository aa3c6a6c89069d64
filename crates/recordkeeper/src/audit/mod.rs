//! Append-only audit trail: disposal-action entries and typed field changes.
//!
//! Every logger function takes a `&Connection` so its writes land in the
//! same transaction as the state change they document. A failed audit
//! write therefore fails, and rolls back, the whole operation.

pub mod fields;
pub mod logger;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;

pub use fields::{classify_field, FieldMap, FieldType, FieldValue};
pub use logger::{log_disposal_action, log_field_change, log_record_changes};

/// Disposal-action types. The string constants are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    RequestCreate,
    RequestSubmit,
    RequestApprove,
    RequestReject,
    DisposalComplete,
    ArchiveComplete,
    ScheduleCreate,
    SystemLog,
}

impl ActionType {
    pub const ALL: [ActionType; 8] = [
        ActionType::RequestCreate,
        ActionType::RequestSubmit,
        ActionType::RequestApprove,
        ActionType::RequestReject,
        ActionType::DisposalComplete,
        ActionType::ArchiveComplete,
        ActionType::ScheduleCreate,
        ActionType::SystemLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RequestCreate => "REQUEST_CREATE",
            ActionType::RequestSubmit => "REQUEST_SUBMIT",
            ActionType::RequestApprove => "REQUEST_APPROVE",
            ActionType::RequestReject => "REQUEST_REJECT",
            ActionType::DisposalComplete => "DISPOSAL_COMPLETE",
            ActionType::ArchiveComplete => "ARCHIVE_COMPLETE",
            ActionType::ScheduleCreate => "SCHEDULE_CREATE",
            ActionType::SystemLog => "SYSTEM_LOG",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action type '{}'", s))
    }
}

/// A disposal-action entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct DisposalActionEntry {
    pub action_type: ActionType,
    pub request_id: Option<i64>,
    pub record_id: Option<i64>,
    pub schedule_id: Option<i64>,
    pub performed_by: i64,
    pub status_from: Option<String>,
    pub status_to: Option<String>,
    pub notes: Option<String>,
    pub document: Option<Vec<u8>>,
    pub office_id: Option<i64>,
    pub role_id: Option<i64>,
}

impl DisposalActionEntry {
    /// Starts an entry attributed to `actor`.
    pub fn new(action_type: ActionType, actor: &Actor) -> Self {
        Self {
            action_type,
            request_id: None,
            record_id: None,
            schedule_id: None,
            performed_by: actor.id,
            status_from: None,
            status_to: None,
            notes: None,
            document: None,
            office_id: actor.office_id,
            role_id: actor.role_id,
        }
    }

    pub fn request(mut self, request_id: i64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn record(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn transition(mut self, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        self.status_from = Some(from.to_string());
        self.status_to = Some(to.to_string());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A stored disposal-action entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalActionLog {
    pub id: i64,
    pub action_type: ActionType,
    pub request_id: Option<i64>,
    pub record_id: Option<i64>,
    pub schedule_id: Option<i64>,
    pub performed_by: i64,
    pub status_from: Option<String>,
    pub status_to: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    pub document: Option<Vec<u8>>,
    pub office_id: Option<i64>,
    pub role_id: Option<i64>,
    pub created_at: String,
}

/// A stored field-change entry. Only the columns matching `field_type`
/// are populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChangeLog {
    pub id: i64,
    pub record_id: i64,
    pub changed_by: i64,
    pub field_name: String,
    pub field_type: FieldType,
    pub old_value_text: Option<String>,
    pub new_value_text: Option<String>,
    pub old_value_number: Option<i64>,
    pub new_value_number: Option<i64>,
    pub old_value_date: Option<NaiveDate>,
    pub new_value_date: Option<NaiveDate>,
    pub old_value_fk: Option<i64>,
    pub new_value_fk: Option<i64>,
    pub change_reason: Option<String>,
    pub created_at: String,
}

/// Everything the audit trail holds for one record.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHistory {
    pub actions: Vec<DisposalActionLog>,
    pub field_changes: Vec<FieldChangeLog>,
}
