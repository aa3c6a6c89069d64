//! Builder patterns for creating test inputs programmatically.

#![allow(dead_code)]

use chrono::NaiveDate;

use recordkeeper::{AgencyInfo, NewDisposalRequest, NewRecord};

use super::harness::{date, CLASS_COMBINED, OFFICE_ID};

/// Builder for creating `NewRecord` inputs.
pub struct RecordBuilder {
    title: String,
    description: Option<String>,
    classification_id: i64,
    office_id: i64,
    period_from: NaiveDate,
}

impl RecordBuilder {
    /// Create a new builder: combined 5+10 classification from 2020-01-15.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            classification_id: CLASS_COMBINED,
            office_id: OFFICE_ID,
            period_from: date("2020-01-15"),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn classification(mut self, id: i64) -> Self {
        self.classification_id = id;
        self
    }

    pub fn office(mut self, id: i64) -> Self {
        self.office_id = id;
        self
    }

    pub fn period_from(mut self, period_from: &str) -> Self {
        self.period_from = date(period_from);
        self
    }

    pub fn build(self) -> NewRecord {
        NewRecord {
            title: self.title,
            description: self.description,
            classification_id: self.classification_id,
            office_id: self.office_id,
            period_from: self.period_from,
        }
    }
}

/// Builder for creating `NewDisposalRequest` inputs.
pub struct RequestBuilder {
    agency: AgencyInfo,
    request_date: NaiveDate,
    compliance_notes: Option<String>,
    record_ids: Vec<i64>,
}

impl RequestBuilder {
    pub fn new(record_ids: &[i64]) -> Self {
        Self {
            agency: AgencyInfo {
                name: "City Records Office".to_string(),
                address: Some("12 Archive Lane".to_string()),
                contact_person: Some("J. Santos".to_string()),
            },
            request_date: date("2026-03-01"),
            compliance_notes: None,
            record_ids: record_ids.to_vec(),
        }
    }

    pub fn agency_name(mut self, name: &str) -> Self {
        self.agency.name = name.to_string();
        self
    }

    pub fn compliance_notes(mut self, notes: &str) -> Self {
        self.compliance_notes = Some(notes.to_string());
        self
    }

    pub fn build(self) -> NewDisposalRequest {
        NewDisposalRequest {
            agency: self.agency,
            request_date: self.request_date,
            compliance_notes: self.compliance_notes,
            record_ids: self.record_ids,
        }
    }
}
