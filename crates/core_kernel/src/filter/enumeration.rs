//! Enum filter operators
//!
//! Enum values are strings drawn from a closed set declared in the entity
//! registry; the set is enforced by the schema layer and the composer.

use serde::Serialize;

use super::{push_equals, push_membership, single_value, Condition};
use crate::error::DomainError;
use crate::query::Predicate;
use crate::value::ScalarValue;

/// Operators legal on enum fields: equality and membership only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_in: Option<Vec<String>>,
}

impl EnumCondition {
    pub fn equals(mut self, value: impl Into<String>) -> Self {
        self.equals = Some(value.into());
        self
    }

    pub fn in_list<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_list = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn not_in<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_in = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Iterates over every value the condition mentions
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.equals
            .iter()
            .chain(self.in_list.iter().flatten())
            .chain(self.not_in.iter().flatten())
            .map(String::as_str)
    }

    /// Fails on the first value outside the closed set
    pub fn check_values(&self, allowed: &[&str]) -> Result<(), DomainError> {
        match self.values().find(|v| !allowed.contains(v)) {
            Some(bad) => Err(DomainError::validation(format!(
                "'{}' is not one of [{}]",
                bad,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

impl Condition for EnumCondition {
    fn predicates(&self, field: &str) -> Vec<Predicate> {
        let mut out = Vec::new();
        push_equals(&mut out, field, &self.equals);
        push_membership(&mut out, field, &self.in_list, &self.not_in);
        out
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn as_equality(&self) -> Option<ScalarValue> {
        if self.not_in.is_some() {
            return None;
        }
        single_value(&self.equals, &self.in_list)
    }
}
