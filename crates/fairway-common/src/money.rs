//! Currency codes
//!
//! Monetary amounts throughout the core are `rust_decimal::Decimal`; this
//! module only supplies the validated currency tag that rides along with
//! every amount.

use crate::{PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the platform bills in. Events carrying anything else are
/// rejected at append time.
const RECOGNIZED: &[&str] = &[
    "USD", "EUR", "GBP", "CAD", "AUD", "NZD", "JPY", "CHF", "SEK", "NOK", "DKK", "ZAR", "SGD",
    "AED", "MXN",
];

/// ISO-4217 style currency code (Value Object)
///
/// # Invariants
/// - Exactly three ASCII uppercase letters
/// - Member of the recognized set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a code.
    pub fn parse(code: impl Into<String>) -> PlatformResult<Self> {
        let code = code.into();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(PlatformError::InvalidEvent(format!(
                "currency code '{code}' is not a three-letter uppercase code"
            )));
        }
        if !RECOGNIZED.contains(&code.as_str()) {
            return Err(PlatformError::InvalidEvent(format!(
                "currency code '{code}' is not recognized"
            )));
        }
        Ok(Self(code))
    }

    /// US dollars, the platform default.
    pub fn usd() -> Self {
        Self("USD".into())
    }

    /// Get inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::usd()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_codes() {
        assert_eq!(CurrencyCode::parse("USD").unwrap().as_str(), "USD");
        assert_eq!(CurrencyCode::parse("GBP").unwrap().as_str(), "GBP");
    }

    #[test]
    fn test_rejects_malformed_and_unknown() {
        assert!(CurrencyCode::parse("usd").is_err());
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("DOLLARS").is_err());
        assert!(CurrencyCode::parse("XXX").is_err());
    }
}
