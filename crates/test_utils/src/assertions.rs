//! Custom Test Assertions
//!
//! Assertion helpers for repository results that print the actual error
//! or ordering when they fail.

use std::fmt::Debug;

use core_kernel::RepositoryError;

/// Asserts that an operation failed with a unique or referential conflict
///
/// # Panics
///
/// Panics if the result is `Ok` or carries another error
pub fn assert_conflict<T: Debug>(result: &Result<T, RepositoryError>) {
    match result {
        Err(error) if error.is_conflict() => {
            let status = error.to_domain_error().map(|e| e.status_code());
            assert_eq!(status, Some(409), "Conflict must map to 409");
        }
        other => panic!("Expected conflict, got {:?}", other),
    }
}

/// Asserts that an operation failed because no row matched
pub fn assert_not_found<T: Debug>(result: &Result<T, RepositoryError>) {
    match result {
        Err(error) if error.is_not_found() => {}
        other => panic!("Expected not found, got {:?}", other),
    }
}

/// Asserts that an operation was rejected with the given error code
///
/// # Arguments
///
/// * `result` - The operation result
/// * `error_code` - Expected code, e.g. `com-1000`
pub fn assert_invalid<T: Debug>(result: &Result<T, RepositoryError>, error_code: &str) {
    match result {
        Err(RepositoryError::Invalid(error)) => assert_eq!(
            error.error_code(),
            error_code,
            "Unexpected error code: {}",
            error.description()
        ),
        other => panic!("Expected invalid request {}, got {:?}", error_code, other),
    }
}

/// Asserts that items are ordered by a key
///
/// # Panics
///
/// Panics at the first adjacent pair out of order
pub fn assert_sorted_by<T, K, F>(items: &[T], key: F, descending: bool)
where
    K: PartialOrd + Debug,
    F: Fn(&T) -> K,
{
    for (index, pair) in items.windows(2).enumerate() {
        let (a, b) = (key(&pair[0]), key(&pair[1]));
        let in_order = if descending { a >= b } else { a <= b };
        assert!(
            in_order,
            "Items {} and {} out of order: {:?} then {:?} (descending: {})",
            index,
            index + 1,
            a,
            b,
            descending
        );
    }
}
