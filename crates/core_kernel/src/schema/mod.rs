//! Validation of untrusted input
//!
//! Schemas parse `serde_json::Value` input into the typed filter, pagination
//! and query shapes. The first violation found is returned as a single
//! BadRequest [`DomainError`] whose description starts with the JSON path of
//! the offending value, e.g. `$.where.volume.gt: expected an integer`.
//!
//! Parsing never mutates its input. Unknown keys are rejected, and so is an
//! explicit JSON `null`: filters have no null operand, so a `null` is refused
//! rather than read as an absent key that would widen the match.
//!
//! Scalars are coerced the way query strings need them:
//! - integers and floats accept JSON numbers or numeric strings
//! - booleans accept `true`/`false` or `"true"`/`"false"`
//! - date-times accept RFC 3339 strings

mod filters;
mod pagination;
mod query;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::DomainError;

pub use filters::{
    BooleanFilterSchema, DateTimeFilterSchema, EnumFilterSchema, FloatFilterSchema,
    IntFilterSchema, StringFilterSchema,
};
pub use pagination::PaginationSchema;
pub use query::{OrderBySchema, QuerySchema, SelectSchema, WhereSchema};

/// A parser from untrusted JSON to a typed shape
pub trait Schema {
    type Output;

    /// Parses a value found at `path` inside a larger document
    fn parse_at(&self, input: &Value, path: &Path) -> Result<Self::Output, DomainError>;

    /// Parses a whole document
    fn parse(&self, input: &Value) -> Result<Self::Output, DomainError> {
        self.parse_at(input, &Path::root())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the input document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// A validation error located at this path
    pub fn error(&self, message: impl fmt::Display) -> DomainError {
        DomainError::validation(format!("{}: {}", self, message))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Fails on the first key holding `null`
pub(crate) fn reject_nulls(map: &Map<String, Value>, path: &Path) -> Result<(), DomainError> {
    match map.iter().find(|(_, value)| value.is_null()) {
        Some((key, _)) => Err(path.key(key).error("null is not accepted; omit the key instead")),
        None => Ok(()),
    }
}

/// A JSON object whose keys have been checked against an allow-list
pub(crate) struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: &'a Path,
}

impl<'a> ObjectReader<'a> {
    pub(crate) fn new(input: &'a Value, path: &'a Path, allowed: &[&str]) -> Result<Self, DomainError> {
        let map = expect_object(input, path)?;
        if let Some(unknown) = map.keys().find(|key| !allowed.contains(&key.as_str())) {
            return Err(path.key(unknown).error("unknown key"));
        }
        reject_nulls(map, path)?;
        Ok(Self { map, path })
    }

    pub(crate) fn path(&self) -> &Path {
        self.path
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub(crate) fn scalar<T>(
        &self,
        key: &str,
        coerce: fn(&Value, &Path) -> Result<T, DomainError>,
    ) -> Result<Option<T>, DomainError> {
        self.get(key).map(|value| coerce(value, &self.path.key(key))).transpose()
    }

    pub(crate) fn list<T>(
        &self,
        key: &str,
        coerce: fn(&Value, &Path) -> Result<T, DomainError>,
    ) -> Result<Option<Vec<T>>, DomainError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let path = self.path.key(key);
        let items = value.as_array().ok_or_else(|| path.error("expected an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| coerce(item, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

pub(crate) fn expect_object<'a>(input: &'a Value, path: &Path) -> Result<&'a Map<String, Value>, DomainError> {
    input.as_object().ok_or_else(|| path.error("expected an object"))
}

pub(crate) fn coerce_string(value: &Value, path: &Path) -> Result<String, DomainError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| path.error("expected a string"))
}

pub(crate) fn coerce_i64(value: &Value, path: &Path) -> Result<i64, DomainError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| path.error("expected an integer"))
}

pub(crate) fn coerce_f64(value: &Value, path: &Path) -> Result<f64, DomainError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| path.error("expected a number"))
}

pub(crate) fn coerce_bool(value: &Value, path: &Path) -> Result<bool, DomainError> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
    .ok_or_else(|| path.error("expected a boolean"))
}

pub(crate) fn coerce_datetime(value: &Value, path: &Path) -> Result<DateTime<Utc>, DomainError> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| path.error("expected an RFC 3339 date-time"))
}
