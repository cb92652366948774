//! Scalar filter schemas

use serde_json::Value;

use super::{
    coerce_bool, coerce_datetime, coerce_f64, coerce_i64, coerce_string, ObjectReader, Path,
    Schema,
};
use crate::error::DomainError;
use crate::filter::{
    BooleanCondition, BooleanFilter, DateTimeCondition, DateTimeFilter, EnumCondition,
    EnumFilter, Filter, FloatCondition, FloatFilter, IntCondition, IntFilter, StringCondition,
    StringFilter,
};

const BOOLEAN_KEYS: &[&str] = &["equals"];
const STRING_KEYS: &[&str] = &[
    "equals", "in", "notIn", "lt", "lte", "gt", "gte", "contains", "startsWith", "endsWith",
];
const NUMERIC_KEYS: &[&str] = &["in", "notIn", "lt", "lte", "gt", "gte"];
const DATETIME_KEYS: &[&str] = &["equals", "in", "notIn", "lt", "lte", "gt", "gte"];
const ENUM_KEYS: &[&str] = &["equals", "in", "notIn"];

/// Parses `{...operators, not?: {...operators}}`
///
/// The nested condition is read with the bare operator keys, so a `not`
/// inside `not` is an unknown key.
fn parse_filter<C, F>(input: &Value, path: &Path, keys: &[&str], condition: F) -> Result<Filter<C>, DomainError>
where
    F: Fn(&ObjectReader<'_>) -> Result<C, DomainError>,
{
    let mut outer_keys = keys.to_vec();
    outer_keys.push("not");
    let reader = ObjectReader::new(input, path, &outer_keys)?;
    let outer = condition(&reader)?;

    let not = match reader.get("not") {
        Some(value) => {
            let not_path = path.key("not");
            let inner = ObjectReader::new(value, &not_path, keys)?;
            Some(condition(&inner)?)
        }
        None => None,
    };

    Ok(Filter {
        condition: outer,
        not,
    })
}

/// Schema of boolean filters: `{equals?, not?: {equals?}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanFilterSchema;

impl Schema for BooleanFilterSchema {
    type Output = BooleanFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<BooleanFilter, DomainError> {
        parse_filter(input, path, BOOLEAN_KEYS, |r| {
            Ok(BooleanCondition {
                equals: r.scalar("equals", coerce_bool)?,
            })
        })
    }
}

/// Schema of string filters
#[derive(Debug, Clone, Copy, Default)]
pub struct StringFilterSchema;

impl Schema for StringFilterSchema {
    type Output = StringFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<StringFilter, DomainError> {
        parse_filter(input, path, STRING_KEYS, |r| {
            Ok(StringCondition {
                equals: r.scalar("equals", coerce_string)?,
                in_list: r.list("in", coerce_string)?,
                not_in: r.list("notIn", coerce_string)?,
                lt: r.scalar("lt", coerce_string)?,
                lte: r.scalar("lte", coerce_string)?,
                gt: r.scalar("gt", coerce_string)?,
                gte: r.scalar("gte", coerce_string)?,
                contains: r.scalar("contains", coerce_string)?,
                starts_with: r.scalar("startsWith", coerce_string)?,
                ends_with: r.scalar("endsWith", coerce_string)?,
            })
        })
    }
}

/// Schema of integer filters; numeric strings are accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct IntFilterSchema;

impl Schema for IntFilterSchema {
    type Output = IntFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<IntFilter, DomainError> {
        parse_filter(input, path, NUMERIC_KEYS, |r| {
            Ok(IntCondition {
                in_list: r.list("in", coerce_i64)?,
                not_in: r.list("notIn", coerce_i64)?,
                lt: r.scalar("lt", coerce_i64)?,
                lte: r.scalar("lte", coerce_i64)?,
                gt: r.scalar("gt", coerce_i64)?,
                gte: r.scalar("gte", coerce_i64)?,
            })
        })
    }
}

/// Schema of float filters; numeric strings are accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatFilterSchema;

impl Schema for FloatFilterSchema {
    type Output = FloatFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<FloatFilter, DomainError> {
        parse_filter(input, path, NUMERIC_KEYS, |r| {
            Ok(FloatCondition {
                in_list: r.list("in", coerce_f64)?,
                not_in: r.list("notIn", coerce_f64)?,
                lt: r.scalar("lt", coerce_f64)?,
                lte: r.scalar("lte", coerce_f64)?,
                gt: r.scalar("gt", coerce_f64)?,
                gte: r.scalar("gte", coerce_f64)?,
            })
        })
    }
}

/// Schema of date-time filters; values are RFC 3339 strings
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeFilterSchema;

impl Schema for DateTimeFilterSchema {
    type Output = DateTimeFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<DateTimeFilter, DomainError> {
        parse_filter(input, path, DATETIME_KEYS, |r| {
            Ok(DateTimeCondition {
                equals: r.scalar("equals", coerce_datetime)?,
                in_list: r.list("in", coerce_datetime)?,
                not_in: r.list("notIn", coerce_datetime)?,
                lt: r.scalar("lt", coerce_datetime)?,
                lte: r.scalar("lte", coerce_datetime)?,
                gt: r.scalar("gt", coerce_datetime)?,
                gte: r.scalar("gte", coerce_datetime)?,
            })
        })
    }
}

/// Schema of enum filters over a closed value set
#[derive(Debug, Clone, Copy)]
pub struct EnumFilterSchema {
    values: &'static [&'static str],
}

impl EnumFilterSchema {
    pub fn new(values: &'static [&'static str]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &'static [&'static str] {
        self.values
    }

    fn member(&self, value: &Value, path: &Path) -> Result<String, DomainError> {
        let value = coerce_string(value, path)?;
        if self.values.contains(&value.as_str()) {
            Ok(value)
        } else {
            Err(path.error(format!("expected one of {}", self.values.join(", "))))
        }
    }

    fn member_list(&self, reader: &ObjectReader<'_>, key: &str) -> Result<Option<Vec<String>>, DomainError> {
        let Some(raw) = reader.list(key, |value, path| Ok((value.clone(), path.clone())))? else {
            return Ok(None);
        };
        raw.iter()
            .map(|(value, path)| self.member(value, path))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

impl Schema for EnumFilterSchema {
    type Output = EnumFilter;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<EnumFilter, DomainError> {
        parse_filter(input, path, ENUM_KEYS, |r| {
            let equals = match r.get("equals") {
                Some(value) => Some(self.member(value, &r.path().key("equals"))?),
                None => None,
            };
            Ok(EnumCondition {
                equals,
                in_list: self.member_list(r, "in")?,
                not_in: self.member_list(r, "notIn")?,
            })
        })
    }
}
