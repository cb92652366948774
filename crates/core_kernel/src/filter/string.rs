//! String filter operators

use serde::Serialize;

use super::{push_equals, push_membership, push_range, single_value, Condition};
use crate::query::{CompareOp, Predicate, TextOp};
use crate::value::ScalarValue;

/// Operators legal on string fields
///
/// Ordering comparisons use byte order; `contains`, `startsWith` and
/// `endsWith` are case sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_in: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
}

impl StringCondition {
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

    pub fn lt(mut self, value: impl Into<String>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<String>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<String>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<String>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn contains(mut self, value: impl Into<String>) -> Self {
        self.contains = Some(value.into());
        self
    }

    pub fn starts_with(mut self, value: impl Into<String>) -> Self {
        self.starts_with = Some(value.into());
        self
    }

    pub fn ends_with(mut self, value: impl Into<String>) -> Self {
        self.ends_with = Some(value.into());
        self
    }
}

/// Shorthands for single-operator string filters
impl super::StringFilter {
    pub fn equals(value: impl Into<String>) -> Self {
        Self::new(StringCondition::default().equals(value))
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::new(StringCondition::default().contains(value))
    }

    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::new(StringCondition::default().starts_with(value))
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::new(StringCondition::default().ends_with(value))
    }
}

impl Condition for StringCondition {
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
        let text = [
            (&self.contains, TextOp::Contains),
            (&self.starts_with, TextOp::StartsWith),
            (&self.ends_with, TextOp::EndsWith),
        ];
        for (value, op) in text {
            if let Some(value) = value {
                out.push(Predicate::text(field, op, value.clone()));
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn row(name: &str) -> Record {
        Record::new().with("symbol", name)
    }

    #[test]
    fn test_text_operators() {
        let condition = StringCondition::default().starts_with("BT").ends_with("C");
        let predicate = crate::filter::Filter::new(condition).to_predicate("symbol");

        assert!(predicate.matches(&row("BTC")));
        assert!(!predicate.matches(&row("BTCX")));
        assert!(!predicate.matches(&row("btc")));
    }

    #[test]
    fn test_empty_in_matches_nothing_and_empty_not_in_everything() {
        let none = crate::filter::Filter::new(StringCondition::default().in_list(Vec::<String>::new()));
        let all = crate::filter::Filter::new(StringCondition::default().not_in(Vec::<String>::new()));

        assert!(!none.to_predicate("symbol").matches(&row("ETH")));
        assert!(all.to_predicate("symbol").matches(&row("ETH")));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let predicate = crate::filter::Filter::new(StringCondition::default().gte("a")).to_predicate("symbol");
        assert!(predicate.matches(&row("b")));
        assert!(!predicate.matches(&row("Z")));
    }

    #[test]
    fn test_shorthand_with_negation() {
        let filter = super::super::StringFilter::contains("TC").negate(StringCondition::default().starts_with("B"));
        let predicate = filter.to_predicate("symbol");

        assert!(predicate.matches(&row("ETC")));
        assert!(!predicate.matches(&row("BTC")));
        assert!(!predicate.matches(&row("ETH")));
    }
}
