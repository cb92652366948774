//! Scalar filter types
//!
//! One filter shape per primitive kind. A filter is a condition (the
//! operators legal for the kind) plus an optional negated condition of the
//! same kind. The negated condition type has no `not` of its own, which caps
//! negation at depth one: a deliberate limit, not an omission.
//!
//! Semantics:
//! - every operator is optional and an empty filter matches everything
//! - operators inside one condition are ANDed
//! - `not` negates the conjunction of the operators inside it, nothing else
//! - `in: []` matches nothing, `notIn: []` imposes no restriction

pub mod boolean;
pub mod datetime;
pub mod enumeration;
pub mod numeric;
pub mod string;

use serde::Serialize;
use std::fmt;

use crate::query::{CompareOp, Predicate};
use crate::value::ScalarValue;

pub use boolean::BooleanCondition;
pub use datetime::DateTimeCondition;
pub use enumeration::EnumCondition;
pub use numeric::{FloatCondition, IntCondition};
pub use string::StringCondition;

/// Operator set of one scalar kind
pub trait Condition: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Lowers every present operator to a predicate on `field`
    fn predicates(&self, field: &str) -> Vec<Predicate>;

    /// True when no operator is present
    fn is_empty(&self) -> bool;

    /// The single value this condition pins the field to, if it is a pure
    /// equality (used to derive upsert keys)
    fn as_equality(&self) -> Option<ScalarValue>;
}

/// A scalar filter: a condition plus at most one level of negation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filter<C> {
    #[serde(flatten)]
    pub condition: C,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<C>,
}

pub type BooleanFilter = Filter<BooleanCondition>;
pub type StringFilter = Filter<StringCondition>;
pub type IntFilter = Filter<IntCondition>;
pub type FloatFilter = Filter<FloatCondition>;
pub type DateTimeFilter = Filter<DateTimeCondition>;
pub type EnumFilter = Filter<EnumCondition>;

impl<C: Condition> Filter<C> {
    pub fn new(condition: C) -> Self {
        Self { condition, not: None }
    }

    /// A filter made only of a negated condition
    pub fn negated(condition: C) -> Self {
        Self {
            condition: C::default(),
            not: Some(condition),
        }
    }

    /// Adds (or replaces) the negated condition
    pub fn negate(mut self, condition: C) -> Self {
        self.not = Some(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_empty() && self.not.as_ref().map_or(true, Condition::is_empty)
    }

    /// Lowers the filter to one predicate on `field`
    ///
    /// An empty negated condition imposes no restriction.
    pub fn to_predicate(&self, field: &str) -> Predicate {
        let mut parts = self.condition.predicates(field);
        if let Some(negated) = &self.not {
            let inner = negated.predicates(field);
            if !inner.is_empty() {
                parts.push(Predicate::not(Predicate::and(inner)));
            }
        }
        Predicate::and(parts)
    }

    /// Equality value of a filter that only pins the field to one value
    pub fn as_equality(&self) -> Option<ScalarValue> {
        if self.not.as_ref().is_some_and(|n| !n.is_empty()) {
            return None;
        }
        self.condition.as_equality()
    }
}

impl<C: Condition> From<C> for Filter<C> {
    fn from(condition: C) -> Self {
        Self::new(condition)
    }
}

pub(crate) fn push_equals<T>(out: &mut Vec<Predicate>, field: &str, equals: &Option<T>)
where
    T: Clone + Into<ScalarValue>,
{
    if let Some(value) = equals {
        out.push(Predicate::compare(field, CompareOp::Eq, value.clone()));
    }
}

pub(crate) fn push_membership<T>(
    out: &mut Vec<Predicate>,
    field: &str,
    in_list: &Option<Vec<T>>,
    not_in: &Option<Vec<T>>,
) where
    T: Clone + Into<ScalarValue>,
{
    if let Some(values) = in_list {
        out.push(Predicate::in_list(field, values.iter().cloned().map(Into::into).collect()));
    }
    if let Some(values) = not_in {
        out.push(Predicate::not_in(field, values.iter().cloned().map(Into::into).collect()));
    }
}

pub(crate) fn push_range<T>(
    out: &mut Vec<Predicate>,
    field: &str,
    bounds: [(&Option<T>, CompareOp); 4],
) where
    T: Clone + Into<ScalarValue>,
{
    for (bound, op) in bounds {
        if let Some(value) = bound {
            out.push(Predicate::compare(field, op, value.clone()));
        }
    }
}

/// Equality value of a condition whose only operator is `equals`, or an
/// `in` list holding exactly one value
pub(crate) fn single_value<T>(equals: &Option<T>, in_list: &Option<Vec<T>>) -> Option<ScalarValue>
where
    T: Clone + Into<ScalarValue>,
{
    match (equals, in_list) {
        (Some(value), None) => Some(value.clone().into()),
        (None, Some(values)) if values.len() == 1 => Some(values[0].clone().into()),
        _ => None,
    }
}
