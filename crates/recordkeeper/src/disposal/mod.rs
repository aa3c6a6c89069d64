//! Disposal request workflow: batching Archived records into a request and
//! applying the approve/reject decision atomically.

pub mod workflow;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use workflow::{create_disposal_request, decide_disposal_request};

/// Default minimum length of rejection remarks.
pub const DEFAULT_REJECT_REMARKS_MIN_LEN: usize = 10;

/// Status of a disposal request. Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }

    /// Pending and Approved requests hold their records.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RequestStatus::Pending),
            "Approved" => Ok(RequestStatus::Approved),
            "Rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status '{}'", other)),
        }
    }
}

/// An admin's verdict on a Pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn resulting_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// Requesting agency details.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgencyInfo {
    pub name: String,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

/// Input for creating a disposal request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDisposalRequest {
    pub agency: AgencyInfo,
    pub request_date: NaiveDate,
    pub compliance_notes: Option<String>,
    pub record_ids: Vec<i64>,
}

/// Input for deciding a disposal request.
#[derive(Debug, Clone, PartialEq)]
pub struct DisposalDecision {
    pub decision: Decision,
    pub remarks: Option<String>,
}

impl DisposalDecision {
    pub fn approve() -> Self {
        Self {
            decision: Decision::Approve,
            remarks: None,
        }
    }

    pub fn reject(remarks: impl Into<String>) -> Self {
        Self {
            decision: Decision::Reject,
            remarks: Some(remarks.into()),
        }
    }
}
