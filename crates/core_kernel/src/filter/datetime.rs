//! Date-time filter operators
//!
//! Nullable and non-nullable date-time fields share this one representation:
//! a UTC timestamp. String input is parsed by the schema layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{push_equals, push_membership, push_range, single_value, Condition};
use crate::query::{CompareOp, Predicate};
use crate::value::ScalarValue;

/// Operators legal on date-time fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<DateTime<Utc>>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_list: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_in: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<DateTime<Utc>>,
}

impl DateTimeCondition {
    pub fn equals(mut self, value: DateTime<Utc>) -> Self {
        self.equals = Some(value);
        self
    }

    pub fn in_list(mut self, values: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        self.in_list = Some(values.into_iter().collect());
        self
    }

    pub fn not_in(mut self, values: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        self.not_in = Some(values.into_iter().collect());
        self
    }

    pub fn lt(mut self, value: DateTime<Utc>) -> Self {
        self.lt = Some(value);
        self
    }

    pub fn lte(mut self, value: DateTime<Utc>) -> Self {
        self.lte = Some(value);
        self
    }

    pub fn gt(mut self, value: DateTime<Utc>) -> Self {
        self.gt = Some(value);
        self
    }

    pub fn gte(mut self, value: DateTime<Utc>) -> Self {
        self.gte = Some(value);
        self
    }

    /// Half-open window `[from, to)`
    pub fn between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.gte(from).lt(to)
    }
}

impl Condition for DateTimeCondition {
    fn predicates(&self, field: &str) -> Vec<Predicate> {
        let mut out = Vec::new();
        push_equals(&mut out, field, &self.equals);
        push_membership(&mut out, field, &self.in_list, &self.not_in);
        push_range(
            &mut out,
            field,
            [
                (&self.lt, CompareOp::Lt),
                (&self.lte, CompareOp::Lte),
                (&self.gt, CompareOp::Gt),
                (&self.gte, CompareOp::Gte),
            ],
        );
        out
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn as_equality(&self) -> Option<ScalarValue> {
        let rest = Self {
            equals: None,
            in_list: None,
            ..self.clone()
        };
        if !rest.is_empty() {
            return None;
        }
        single_value(&self.equals, &self.in_list)
    }
}
