//! Store-neutral cell values
//!
//! Records travel between models and store adapters as ordered maps from
//! field name to [`ScalarValue`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    String(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ScalarValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Compares two non-null values of the same kind
    ///
    /// Strings compare by bytes, matching the `COLLATE "C"` ordering the SQL
    /// adapter requests. Int and Float compare numerically with each other.
    /// Returns `None` for nulls, mismatched kinds and NaN.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::String(a), ScalarValue::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (ScalarValue::Int(a), ScalarValue::Int(b)) => Some(a.cmp(b)),
            (
                ScalarValue::Int(_) | ScalarValue::Float(_),
                ScalarValue::Int(_) | ScalarValue::Float(_),
            ) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            (ScalarValue::DateTime(a), ScalarValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            ScalarValue::String(v) => f.write_str(v),
        }
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(value: DateTime<Utc>) -> Self {
        ScalarValue::DateTime(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

/// A row: field name to value, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, ScalarValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style
    pub fn with(mut self, field: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<ScalarValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Returns the field value; a missing field reads as `Null`
    pub fn get(&self, field: &str) -> &ScalarValue {
        static NULL: ScalarValue = ScalarValue::Null;
        self.0.get(field).unwrap_or(&NULL)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Overwrites every field present in `changes`
    pub fn merge(&mut self, changes: &Record) {
        for (field, value) in changes.iter() {
            self.0.insert(field.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScalarValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ScalarValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, ScalarValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_compare_is_bytewise() {
        let upper = ScalarValue::from("Z");
        let lower = ScalarValue::from("a");
        assert_eq!(upper.compare(&lower), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_mismatched_kinds() {
        assert_eq!(ScalarValue::from(1i64).compare(&ScalarValue::from("1")), None);
        assert_eq!(ScalarValue::Null.compare(&ScalarValue::Null), None);
        assert_eq!(
            ScalarValue::from(2i64).compare(&ScalarValue::from(1.5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_record_missing_field_is_null() {
        let record = Record::new().with("name", "btc");
        assert!(record.get("price").is_null());
        assert_eq!(record.get("name").as_str(), Some("btc"));
    }
}
