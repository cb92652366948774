//! Domain error model
//!
//! Every failure that crosses a layer boundary is described by a
//! [`DomainError`]: a fixed category message, a free-text description, an
//! HTTP-like status code and a stable machine-readable error code.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable machine-readable error codes, namespaced per domain area
pub mod codes {
    /// Common validation failure (malformed filter, pagination, value)
    pub const COMMON_VALIDATION: &str = "com-1000";
    /// Common lookup failure
    pub const COMMON_NOT_FOUND: &str = "com-1001";
    /// Common write conflict (duplicate key, referential conflict)
    pub const COMMON_CONFLICT: &str = "com-1002";
    /// Common authentication failure
    pub const COMMON_UNAUTHORIZED: &str = "com-1003";

    /// Account area: malformed email address
    pub const ACCOUNT_INVALID_EMAIL: &str = "acc-1000";
    /// Account area: unusable digest secret
    pub const ACCOUNT_INVALID_SECRET: &str = "acc-1001";

    /// Market area: malformed ticker symbol
    pub const MARKET_INVALID_SYMBOL: &str = "mkt-1000";
    /// Market area: price outside the accepted range
    pub const MARKET_INVALID_PRICE: &str = "mkt-1001";
}

/// Error taxonomy by status semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or invalid input
    BadRequest,
    /// Missing or invalid credentials
    Unauthorized,
    /// The addressed record does not exist
    NotFound,
    /// The write conflicts with existing data
    Conflict,
}

impl ErrorKind {
    /// Returns the HTTP-like status code of this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
        }
    }

    /// Returns the fixed human message of this kind
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// An immutable domain error
///
/// Fields are private; an instance is fixed once constructed through one of
/// the kind-specific constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} [{error_code}]: {description}")]
pub struct DomainError {
    #[serde(skip)]
    kind: ErrorKind,
    message: &'static str,
    description: String,
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(rename = "errorCode")]
    error_code: &'static str,
}

impl DomainError {
    /// Creates an error of the given kind
    pub fn new(kind: ErrorKind, error_code: &'static str, description: impl Into<String>) -> Self {
        Self {
            kind,
            message: kind.message(),
            description: description.into(),
            status_code: kind.status_code(),
            error_code,
        }
    }

    /// Creates a BadRequest (400) error
    pub fn bad_request(error_code: &'static str, description: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, error_code, description)
    }

    /// Creates a BadRequest error with the common validation code
    pub fn validation(description: impl Into<String>) -> Self {
        Self::bad_request(codes::COMMON_VALIDATION, description)
    }

    /// Creates an Unauthorized (401) error
    pub fn unauthorized(error_code: &'static str, description: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, error_code, description)
    }

    /// Creates a NotFound (404) error
    pub fn not_found(error_code: &'static str, description: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, error_code, description)
    }

    /// Creates a Conflict (409) error
    pub fn conflict(error_code: &'static str, description: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, error_code, description)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn error_code(&self) -> &'static str {
        self.error_code
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::BadRequest
    }
}

/// Boundary-level error body
///
/// Serialises as `{"message": [...], "statusCode": 400, "error": "Bad Request"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: Vec<String>,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub error: String,
}

impl From<&DomainError> for ErrorResponse {
    fn from(error: &DomainError) -> Self {
        Self {
            message: vec![format!("{}: {}", error.error_code, error.description)],
            status_code: error.status_code,
            error: error.message.to_string(),
        }
    }
}

impl From<DomainError> for ErrorResponse {
    fn from(error: DomainError) -> Self {
        Self::from(&error)
    }
}
