//! Email address value object

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidateEmail;

use core_kernel::{codes, ActionResult, DomainError};

/// A syntactically valid, lowercased email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validates and normalises an address
    ///
    /// Surrounding whitespace is trimmed and the address is lowercased.
    pub fn new(raw: impl AsRef<str>) -> ActionResult<Email> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.validate_email() {
            ActionResult::success(Email(normalised))
        } else {
            ActionResult::failure(DomainError::bad_request(
                codes::ACCOUNT_INVALID_EMAIL,
                format!("'{}' is not a valid email address", raw.as_ref()),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `@`
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value).into_result()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> String {
        email.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalises_case_and_whitespace() {
        let email = Email::new("  Ada@Example.COM ").into_result().unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for raw in ["", "plain", "@example.com", "a@", "a b@example.com"] {
            let result = Email::new(raw);
            assert!(result.is_failure(), "{raw} should be rejected");
            assert_eq!(result.error().unwrap().error_code(), "acc-1000");
        }
    }

    #[test]
    fn test_deserialisation_validates() {
        let parsed: Email = serde_json::from_str("\"grace@navy.mil\"").unwrap();
        assert_eq!(parsed.as_str(), "grace@navy.mil");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
