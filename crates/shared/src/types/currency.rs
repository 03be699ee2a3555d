//! ISO 4217 currency codes.
//!
//! Currency codes arrive from chat messages, AI output, provider feeds and
//! configuration in every possible casing. They are normalized once, here.

use serde::{Deserialize, Serialize};

/// A normalized three-letter currency code (e.g. "USD", "TWD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a code from a compile-time constant known to be valid.
    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }

    /// Normalizes a free-form code: trims whitespace and uppercases.
    ///
    /// Does not validate; use `parse` when the value must be a real code.
    #[must_use]
    pub fn normalize(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }

    /// Returns true when both codes denote the same currency, ignoring case.
    #[must_use]
    pub fn same(a: &str, b: &str) -> bool {
        a.trim().eq_ignore_ascii_case(b.trim())
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Self::normalize(s);
        if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(normalized))
        } else {
            Err(format!("Unknown currency: {s}"))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
