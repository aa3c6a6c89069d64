//! Static field classification for typed field-change entries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column family a changed field's values are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Enum,
    ForeignKey,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Enum => "enum",
            FieldType::ForeignKey => "foreign_key",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "enum" => Ok(FieldType::Enum),
            "foreign_key" => Ok(FieldType::ForeignKey),
            other => Err(format!("unknown field type '{}'", other)),
        }
    }
}

const FOREIGN_KEY_FIELDS: &[&str] = &["classification_id", "office_id", "request_id"];
const DATE_FIELDS: &[&str] = &["period_from", "period_to"];
const ENUM_FIELDS: &[&str] = &["status", "time_value"];
const NUMBER_FIELDS: &[&str] = &["active_years", "storage_years", "total_years"];

/// Returns the storage type of a record field. Unknown fields are text.
pub fn classify_field(field: &str) -> FieldType {
    if FOREIGN_KEY_FIELDS.contains(&field) {
        FieldType::ForeignKey
    } else if DATE_FIELDS.contains(&field) {
        FieldType::Date
    } else if ENUM_FIELDS.contains(&field) {
        FieldType::Enum
    } else if NUMBER_FIELDS.contains(&field) {
        FieldType::Number
    } else {
        FieldType::Text
    }
}

/// A field value as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(i64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Integer form, parsing text when it holds a number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Date form, parsing `YYYY-MM-DD` text.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(i64::from(n))
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Field name to value snapshot of a record.
pub type FieldMap = BTreeMap<&'static str, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(classify_field("classification_id"), FieldType::ForeignKey);
        assert_eq!(classify_field("office_id"), FieldType::ForeignKey);
        assert_eq!(classify_field("period_from"), FieldType::Date);
        assert_eq!(classify_field("period_to"), FieldType::Date);
        assert_eq!(classify_field("status"), FieldType::Enum);
        assert_eq!(classify_field("time_value"), FieldType::Enum);
        assert_eq!(classify_field("total_years"), FieldType::Number);
        assert_eq!(classify_field("title"), FieldType::Text);
        assert_eq!(classify_field("anything_else"), FieldType::Text);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(FieldValue::from("42").as_i64(), Some(42));
        assert_eq!(FieldValue::from("forty-two").as_i64(), None);
        assert_eq!(
            FieldValue::from("2025-01-15").as_date(),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(FieldValue::from(None::<String>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(5u32)), FieldValue::Number(5));
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap()).as_text(),
            Some("2020-01-15".to_string())
        );
    }
}
