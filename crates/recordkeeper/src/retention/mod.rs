//! Retention calculator.
//!
//! Turns a classification's free-text retention description into active,
//! storage and total year counts, and derives the archival and disposal
//! dates from a record's start date. Pure functions, no I/O.

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_COMBINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*years?\s+active\s*\+\s*(\d+)\s*years?\s+storage").unwrap()
});
static RE_ACTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?\s+active").unwrap());
static RE_STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?\s+storage").unwrap());
static RE_BARE_YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?\b").unwrap());

/// Year counts derived from a retention description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RetentionYears {
    pub active: u32,
    pub storage: u32,
    pub total: u32,
    pub permanent: bool,
}

impl RetentionYears {
    pub const PERMANENT: RetentionYears = RetentionYears {
        active: 0,
        storage: 0,
        total: 0,
        permanent: true,
    };

    pub fn new(active: u32, storage: u32) -> Self {
        Self {
            active,
            storage,
            total: active.saturating_add(storage),
            permanent: false,
        }
    }

    /// True when a non-permanent schedule carries no years at all.
    pub fn is_empty(&self) -> bool {
        !self.permanent && self.active == 0 && self.storage == 0
    }
}

/// Which rule produced a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionBasis {
    /// The text contains "permanent".
    Permanent,
    /// `<N> years active + <M> years storage`.
    Combined,
    /// `<N> years active` and/or `<M> years storage` found separately.
    Keyword,
    /// A bare `<N> years` with no keyword, read through [`BareYearsPolicy`].
    BareYears,
    /// Nothing recognisable; needs operator review.
    Unparsed,
}

/// What to do with a bare `<N> years` that names neither phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BareYearsPolicy {
    /// Count the whole value as active years.
    #[default]
    TreatAsActive,
    /// Report the text as unparsed.
    Reject,
}

/// Outcome of parsing one retention description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionParse {
    pub years: RetentionYears,
    pub basis: RetentionBasis,
}

impl RetentionParse {
    fn unparsed() -> Self {
        Self {
            years: RetentionYears::default(),
            basis: RetentionBasis::Unparsed,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        self.basis == RetentionBasis::Unparsed
    }
}

/// Parses a retention description. Matching is case-insensitive.
pub fn parse_retention(text: &str, policy: BareYearsPolicy) -> RetentionParse {
    let lower = text.to_lowercase();

    if lower.contains("permanent") {
        return RetentionParse {
            years: RetentionYears::PERMANENT,
            basis: RetentionBasis::Permanent,
        };
    }

    if let Some(caps) = RE_COMBINED.captures(text) {
        if let (Some(active), Some(storage)) = (number(&caps, 1), number(&caps, 2)) {
            return RetentionParse {
                years: RetentionYears::new(active, storage),
                basis: RetentionBasis::Combined,
            };
        }
    }

    let active = RE_ACTIVE.captures(text).and_then(|c| number(&c, 1));
    let storage = RE_STORAGE.captures(text).and_then(|c| number(&c, 1));
    if active.is_some() || storage.is_some() {
        return RetentionParse {
            years: RetentionYears::new(active.unwrap_or(0), storage.unwrap_or(0)),
            basis: RetentionBasis::Keyword,
        };
    }

    let has_keyword = lower.contains("active") || lower.contains("storage");
    if !has_keyword {
        if let Some(years) = RE_BARE_YEARS.captures(text).and_then(|c| number(&c, 1)) {
            return match policy {
                BareYearsPolicy::TreatAsActive => RetentionParse {
                    years: RetentionYears::new(years, 0),
                    basis: RetentionBasis::BareYears,
                },
                BareYearsPolicy::Reject => RetentionParse::unparsed(),
            };
        }
    }

    RetentionParse::unparsed()
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Adds whole calendar years. Feb 29 lands on Feb 28 in non-leap years.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Archival due date: `period_from + active` years. Only active years
/// advance this date; storage years do not.
pub fn end_date(period_from: NaiveDate, years: &RetentionYears) -> Option<NaiveDate> {
    if years.permanent {
        return None;
    }
    add_years(period_from, years.active)
}

/// Disposal due date: `period_from + total` years.
pub fn disposal_date(period_from: NaiveDate, total_years: u32) -> Option<NaiveDate> {
    add_years(period_from, total_years)
}
