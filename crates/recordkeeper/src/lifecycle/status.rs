//! Record status and time-value enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a record. The string forms are stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
    Archived,
    #[serde(rename = "Scheduled for Disposal")]
    ScheduledForDisposal,
    Disposed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 5] = [
        RecordStatus::Active,
        RecordStatus::Inactive,
        RecordStatus::Archived,
        RecordStatus::ScheduledForDisposal,
        RecordStatus::Disposed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Inactive => "Inactive",
            RecordStatus::Archived => "Archived",
            RecordStatus::ScheduledForDisposal => "Scheduled for Disposal",
            RecordStatus::Disposed => "Disposed",
        }
    }

    /// Active and Inactive are both "not yet archived".
    pub fn is_pre_archival(&self) -> bool {
        matches!(self, RecordStatus::Active | RecordStatus::Inactive)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Disposed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown record status '{}'", s))
    }
}

/// Whether a record's retention schedule is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeValue {
    Permanent,
    Temporary,
}

impl TimeValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeValue::Permanent => "Permanent",
            TimeValue::Temporary => "Temporary",
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Permanent" => Ok(TimeValue::Permanent),
            "Temporary" => Ok(TimeValue::Temporary),
            other => Err(format!("unknown time value '{}'", other)),
        }
    }
}
