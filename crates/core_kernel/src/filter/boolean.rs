//! Boolean filter operators

use serde::Serialize;

use super::{push_equals, Condition};
use crate::query::Predicate;
use crate::value::ScalarValue;

/// Operators legal on boolean fields: equality only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BooleanCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<bool>,
}

impl BooleanCondition {
    pub fn equals(mut self, value: bool) -> Self {
        self.equals = Some(value);
        self
    }
}

impl Condition for BooleanCondition {
    fn predicates(&self, field: &str) -> Vec<Predicate> {
        let mut out = Vec::new();
        push_equals(&mut out, field, &self.equals);
        out
    }

    fn is_empty(&self) -> bool {
        self.equals.is_none()
    }

    fn as_equality(&self) -> Option<ScalarValue> {
        self.equals.map(ScalarValue::from)
    }
}
