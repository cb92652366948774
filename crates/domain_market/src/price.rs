//! Quoted price value object

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{codes, ActionResult, DomainError};

/// A strictly positive, finite price
///
/// Stored as a float column so it can be filtered with the float filter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> ActionResult<Price> {
        if value.is_finite() && value > 0.0 {
            ActionResult::success(Price(value))
        } else {
            ActionResult::failure(DomainError::bad_request(
                codes::MARKET_INVALID_PRICE,
                format!("price must be a positive finite number, got {}", value),
            ))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Relative change from `previous` to `self`
    pub fn change_from(&self, previous: Price) -> f64 {
        (self.0 - previous.0) / previous.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Price {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Price::new(value).into_result()
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        for value in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let result = Price::new(value);
            assert_eq!(result.error().map(|e| e.error_code()), Some("mkt-1001"));
        }
    }

    #[test]
    fn test_change_from() {
        let before = Price::new(100.0).into_result().unwrap();
        let after = Price::new(110.0).into_result().unwrap();
        assert!((after.change_from(before) - 0.1).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_positive_finite_prices_are_accepted(value in 1e-9f64..1e12) {
            let price = Price::new(value).into_result().unwrap();
            prop_assert_eq!(price.value(), value);
        }
    }
}
