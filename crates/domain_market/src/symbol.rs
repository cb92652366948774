//! Ticker symbol value object

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{codes, ActionResult, DomainError};

/// An uppercase ticker such as `AAPL`, `BRK.B` or `EUR/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub const MAX_LEN: usize = 12;

    /// Validates and normalises a ticker
    ///
    /// Input is trimmed and uppercased. A symbol starts with a letter or
    /// digit and may contain `.`, `-` and `/` after that.
    pub fn new(raw: impl AsRef<str>) -> ActionResult<Symbol> {
        let normalised = raw.as_ref().trim().to_ascii_uppercase();
        match Self::check(&normalised) {
            Ok(()) => ActionResult::success(Symbol(normalised)),
            Err(reason) => ActionResult::failure(DomainError::bad_request(
                codes::MARKET_INVALID_SYMBOL,
                format!("'{}' is not a valid symbol: {}", raw.as_ref(), reason),
            )),
        }
    }

    fn check(symbol: &str) -> Result<(), &'static str> {
        let mut chars = symbol.chars();
        match chars.next() {
            None => return Err("empty"),
            Some(first) if !first.is_ascii_alphanumeric() => {
                return Err("must start with a letter or digit")
            }
            Some(_) => {}
        }
        if symbol.len() > Self::MAX_LEN {
            return Err("too long");
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/')) {
            return Err("unexpected character");
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::new(value).into_result()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> String {
        symbol.0
    }
}
