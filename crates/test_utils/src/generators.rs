//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use domain_account::Role;
use domain_market::{AssetClass, QuoteSource};

/// Strategy for raw symbols that [`domain_market::Symbol::new`] accepts
pub fn symbol_strategy() -> impl Strategy<Value = String> {
    "[A-Z0-9][A-Z0-9./-]{0,11}"
}

/// Strategy for raw symbols in mixed case with padding
pub fn messy_symbol_strategy() -> impl Strategy<Value = String> {
    (" {0,2}", "[a-zA-Z][a-zA-Z0-9]{0,7}", " {0,2}").prop_map(|(l, s, r)| format!("{}{}{}", l, s, r))
}

/// Strategy for valid prices
pub fn price_strategy() -> impl Strategy<Value = f64> {
    (1u64..10_000_000_000u64).prop_map(|micros| micros as f64 / 1_000_000.0)
}

/// Strategy for values [`domain_market::Price::new`] must reject
pub fn invalid_price_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(f64::NAN),
        Just(f64::INFINITY),
        (1u32..1_000_000u32).prop_map(|n| -f64::from(n)),
    ]
}

/// Strategy for `(page, elements_by_page)` pairs within the default limits
pub fn page_request_strategy() -> impl Strategy<Value = (u32, u32)> {
    (1u32..1000u32, 1u32..=100u32)
}

pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Member), Just(Role::Viewer)]
}

pub fn asset_class_strategy() -> impl Strategy<Value = AssetClass> {
    prop_oneof![
        Just(AssetClass::Equity),
        Just(AssetClass::Crypto),
        Just(AssetClass::Fx),
        Just(AssetClass::Commodity),
    ]
}

pub fn quote_source_strategy() -> impl Strategy<Value = QuoteSource> {
    prop_oneof![
        Just(QuoteSource::Exchange),
        Just(QuoteSource::Aggregator),
        Just(QuoteSource::Manual),
    ]
}

/// Strategy for timestamps in 2020-2030, whole seconds
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..(10 * 365 * 24 * 3600)).prop_map(|secs| {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PageRequest;
    use domain_market::{Price, Symbol};

    proptest! {
        #[test]
        fn test_generated_symbols_are_accepted(raw in symbol_strategy()) {
            prop_assert!(Symbol::new(&raw).is_success());
        }

        #[test]
        fn test_messy_symbols_normalise(raw in messy_symbol_strategy()) {
            let symbol = Symbol::new(&raw).into_result().unwrap();
            prop_assert_eq!(symbol.as_str(), raw.trim().to_ascii_uppercase());
        }

        #[test]
        fn test_generated_prices_are_accepted(value in price_strategy()) {
            prop_assert!(Price::new(value).is_success());
        }

        #[test]
        fn test_invalid_prices_are_rejected(value in invalid_price_strategy()) {
            prop_assert!(Price::new(value).is_failure());
        }

        #[test]
        fn test_page_requests_are_accepted((page, size) in page_request_strategy()) {
            prop_assert!(PageRequest::new(page, size).is_ok());
        }
    }
}
