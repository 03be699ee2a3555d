//! Parsed expense candidates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account recorded when a message does not name one.
pub const DEFAULT_ACCOUNT: &str = "Cash";

/// An expense extracted from a message, not yet categorized or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedExpenseCandidate {
    /// What the money was spent on.
    pub description: String,
    /// Amount in `currency`.
    pub amount: Decimal,
    /// ISO 4217 code the amount is denominated in.
    pub currency: String,
    /// Currency token exactly as written in the message ("$", "元", "usd"), empty if none.
    pub currency_original: String,
    /// Category name proposed by the extractor, if any.
    pub suggested_category: Option<String>,
    /// When the expense happened; `None` until resolved from the message.
    pub date: Option<DateTime<Utc>>,
    /// Payment account.
    pub account: String,
}

impl ParsedExpenseCandidate {
    /// Creates a candidate paid in cash with no date or category.
    #[must_use]
    pub fn new(description: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            amount,
            currency: currency.into(),
            currency_original: String::new(),
            suggested_category: None,
            date: None,
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }

    /// Records the currency token as it appeared in the message.
    #[must_use]
    pub fn with_currency_original(mut self, token: impl Into<String>) -> Self {
        self.currency_original = token.into();
        self
    }
}
