//! Integer and float filter operators
//!
//! Numeric kinds carry membership and ordering operators; equality is
//! expressed as a one-element `in` list.

use serde::Serialize;

use super::{push_membership, push_range, single_value, Condition};
use crate::query::{CompareOp, Predicate};
use crate::value::ScalarValue;

macro_rules! numeric_condition {
    ($name:ident, $scalar:ty, $kind:literal) => {
        #[doc = concat!("Operators legal on ", $kind, " fields")]
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
            pub in_list: Option<Vec<$scalar>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub not_in: Option<Vec<$scalar>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub lt: Option<$scalar>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub lte: Option<$scalar>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub gt: Option<$scalar>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub gte: Option<$scalar>,
        }

        impl $name {
            pub fn in_list(mut self, values: impl IntoIterator<Item = $scalar>) -> Self {
                self.in_list = Some(values.into_iter().collect());
                self
            }

            pub fn not_in(mut self, values: impl IntoIterator<Item = $scalar>) -> Self {
                self.not_in = Some(values.into_iter().collect());
                self
            }

            pub fn lt(mut self, value: $scalar) -> Self {
                self.lt = Some(value);
                self
            }

            pub fn lte(mut self, value: $scalar) -> Self {
                self.lte = Some(value);
                self
            }

            pub fn gt(mut self, value: $scalar) -> Self {
                self.gt = Some(value);
                self
            }

            pub fn gte(mut self, value: $scalar) -> Self {
                self.gte = Some(value);
                self
            }
        }

        impl Condition for $name {
            fn predicates(&self, field: &str) -> Vec<Predicate> {
                let mut out = Vec::new();
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
                    in_list: None,
                    ..self.clone()
                };
                if !rest.is_empty() {
                    return None;
                }
                single_value::<$scalar>(&None, &self.in_list)
            }
        }
    };
}

numeric_condition!(IntCondition, i64, "integer");
numeric_condition!(FloatCondition, f64, "float");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::value::Record;

    #[test]
    fn test_float_range() {
        let predicate = Filter::new(FloatCondition::default().gt(1.5).lte(3.0)).to_predicate("price");
        let row = |v: f64| Record::new().with("price", v);

        assert!(predicate.matches(&row(3.0)));
        assert!(!predicate.matches(&row(1.5)));
    }

    #[test]
    fn test_single_in_is_equality() {
        let condition = IntCondition::default().in_list([7]);
        assert_eq!(condition.as_equality(), Some(ScalarValue::Int(7)));
        assert!(IntCondition::default().in_list([7, 8]).as_equality().is_none());
    }
}
