//! Cost computation and recording.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::CostLogId;
use tracing::{debug, warn};

use super::store::CostLogStore;
use super::types::{AiCostLog, CostEvent};
use crate::ai::TokenUsage;
use crate::pricing::{PricingConfig, PricingLedger};

/// Currency recorded when no pricing row is configured.
pub const FALLBACK_COST_CURRENCY: &str = "USD";

/// `input_tokens * input_price + output_tokens * output_price`, exact in decimal.
///
/// Returns `None` when the cost does not fit in a `Decimal`.
#[must_use]
pub fn compute_cost(usage: TokenUsage, pricing: &PricingConfig) -> Option<Decimal> {
    let input = Decimal::from(usage.input_tokens).checked_mul(pricing.input_token_price)?;
    let output = Decimal::from(usage.output_tokens).checked_mul(pricing.output_token_price)?;
    input.checked_add(output)
}

/// Turns metered AI calls into cost log rows.
///
/// Never fails: pricing and storage problems are logged and swallowed so the
/// operation that triggered the call is never affected.
pub struct CostMeter {
    ledger: Arc<dyn PricingLedger>,
    logs: Arc<dyn CostLogStore>,
}

impl CostMeter {
    /// Creates a meter.
    #[must_use]
    pub fn new(ledger: Arc<dyn PricingLedger>, logs: Arc<dyn CostLogStore>) -> Self {
        Self { ledger, logs }
    }

    /// Records one event; returns the stored row, or `None` when nothing was stored.
    pub async fn record(&self, event: CostEvent) -> Option<AiCostLog> {
        let Some(usage) = event.billable_usage() else {
            debug!(operation = %event.operation, "no token usage, skipping cost log");
            return None;
        };

        let pricing = match self.ledger.find_active(&event.provider, &event.model).await {
            Ok(pricing) => pricing,
            Err(err) => {
                warn!(provider = %event.provider, model = %event.model, error = %err, "pricing lookup failed");
                None
            }
        };

        let (cost, currency, cost_note) = match &pricing {
            Some(pricing) => match compute_cost(usage, pricing) {
                Some(cost) => (cost, pricing.currency.clone(), None),
                None => {
                    warn!(provider = %event.provider, model = %event.model, "AI cost overflows");
                    (
                        Decimal::ZERO,
                        pricing.currency.clone(),
                        Some(format!("cost overflows for {}/{}", event.provider, event.model)),
                    )
                }
            },
            None => (
                Decimal::ZERO,
                FALLBACK_COST_CURRENCY.to_string(),
                Some(format!(
                    "no active pricing for {}/{}",
                    event.provider, event.model
                )),
            ),
        };

        let log = AiCostLog {
            id: CostLogId::new(),
            user_id: event.user_id,
            operation: event.operation,
            provider: event.provider,
            model: event.model,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total(),
            cost,
            currency,
            cost_note,
            created_at: Utc::now(),
        };

        match self.logs.insert(&log).await {
            Ok(()) => {
                debug!(
                    user_id = %log.user_id,
                    operation = %log.operation,
                    total_tokens = log.total_tokens,
                    cost = %log.cost,
                    "recorded AI cost"
                );
                Some(log)
            }
            Err(err) => {
                warn!(user_id = %log.user_id, operation = %log.operation, error = %err, "failed to record AI cost");
                None
            }
        }
    }
}
