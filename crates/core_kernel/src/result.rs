//! Success-or-error wrapper for fallible value construction
//!
//! Value objects never panic or return `Err` when their input is rejected;
//! they hand back an [`ActionResult`] the caller branches on.

use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq)]
enum Outcome<T> {
    Success(T),
    Failure(DomainError),
}

/// Either `data` or `error`, never both
///
/// The representation is private: the only constructors are
/// [`ActionResult::success`] and [`ActionResult::failure`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    outcome: Outcome<T>,
}

impl<T> ActionResult<T> {
    pub fn success(value: T) -> Self {
        Self {
            outcome: Outcome::Success(value),
        }
    }

    pub fn failure(error: DomainError) -> Self {
        Self {
            outcome: Outcome::Failure(error),
        }
    }

    /// The carried value, `None` for a failure
    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The carried error, `None` for a success
    pub fn error(&self) -> Option<&DomainError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Converts into a standard `Result` so callers can use `?`
    pub fn into_result(self) -> Result<T, DomainError> {
        match self.outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }

    /// Maps the success value, passing failures through untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        match self.outcome {
            Outcome::Success(value) => ActionResult::success(f(value)),
            Outcome::Failure(error) => ActionResult::failure(error),
        }
    }

    /// Chains another fallible construction on success
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ActionResult<U>) -> ActionResult<U> {
        match self.outcome {
            Outcome::Success(value) => f(value),
            Outcome::Failure(error) => ActionResult::failure(error),
        }
    }
}

impl<T> From<Result<T, DomainError>> for ActionResult<T> {
    fn from(result: Result<T, DomainError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match &self.outcome {
            Outcome::Success(value) => map.serialize_entry("data", value)?,
            Outcome::Failure(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}
