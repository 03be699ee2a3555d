//! Pricing ledger types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::PricingConfigId;

/// One versioned price row for a (provider, model) pair.
///
/// Prices are never edited in place. A price change deactivates the current
/// row and inserts a new one, so the ledger keeps the full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Row identifier.
    pub id: PricingConfigId,
    /// Provider name (e.g. "gemini").
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Price per input token.
    pub input_token_price: Decimal,
    /// Price per output token.
    pub output_token_price: Decimal,
    /// Currency the prices are quoted in.
    pub currency: String,
    /// When this price took effect.
    pub effective_date: DateTime<Utc>,
    /// At most one active row exists per (provider, model).
    pub is_active: bool,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last activation change.
    pub updated_at: DateTime<Utc>,
}

/// A price row as published by a pricing provider, before it enters the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfigInput {
    /// Provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Price per input token.
    pub input_token_price: Decimal,
    /// Price per output token.
    pub output_token_price: Decimal,
    /// Quote currency, USD when the feed omits it.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Effective time, the fetch time when the feed omits it.
    #[serde(default = "Utc::now")]
    pub effective_date: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl PricingConfigInput {
    /// Creates an input effective now, priced in USD.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        input_token_price: Decimal,
        output_token_price: Decimal,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            input_token_price,
            output_token_price,
            currency: default_currency(),
            effective_date: Utc::now(),
        }
    }

    /// Builds the active ledger row this input becomes when created.
    #[must_use]
    pub fn into_active(self, now: DateTime<Utc>) -> PricingConfig {
        PricingConfig {
            id: PricingConfigId::new(),
            provider: self.provider,
            model: self.model,
            input_token_price: self.input_token_price,
            output_token_price: self.output_token_price,
            currency: self.currency,
            effective_date: self.effective_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
