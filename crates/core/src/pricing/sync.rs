//! Pricing synchronization job.
//!
//! Reconciles the prices a [`PricingProvider`] publishes against the
//! [`PricingLedger`]. Changed prices supersede the active row; unchanged ones
//! are skipped, so repeated runs against the same feed write nothing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::ledger::{PricingLedger, PricingProvider};
use super::types::{PricingConfig, PricingConfigInput};

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PricingSyncReport {
    /// False only when the provider fetch itself failed.
    pub success: bool,
    /// Rows created (new models and superseded prices).
    pub models_updated: usize,
    /// Models whose active price already matched.
    pub models_unchanged: usize,
    /// One message per failed model, or the fetch failure.
    pub errors: Vec<String>,
}

/// True when `incoming` must be written: no active row, or either price differs.
///
/// Prices are compared by exact decimal equality.
#[must_use]
pub fn price_changed(current: Option<&PricingConfig>, incoming: &PricingConfigInput) -> bool {
    current.is_none_or(|active| {
        active.input_token_price != incoming.input_token_price
            || active.output_token_price != incoming.output_token_price
    })
}

/// Keeps the pricing ledger in line with a provider feed.
pub struct PricingSync {
    ledger: Arc<dyn PricingLedger>,
    provider: Arc<dyn PricingProvider>,
}

impl PricingSync {
    /// Creates a sync job.
    #[must_use]
    pub fn new(ledger: Arc<dyn PricingLedger>, provider: Arc<dyn PricingProvider>) -> Self {
        Self { ledger, provider }
    }

    /// Runs one synchronization pass.
    pub async fn sync(&self) -> PricingSyncReport {
        let fetched = match self.provider.fetch().await {
            Ok(fetched) => fetched,
            Err(err) => {
                error!(error = %err, "pricing fetch failed");
                return PricingSyncReport {
                    success: false,
                    errors: vec![format!("fetch failed: {err}")],
                    ..PricingSyncReport::default()
                };
            }
        };

        let mut report = PricingSyncReport {
            success: true,
            ..PricingSyncReport::default()
        };

        for input in &fetched {
            match self.apply(input).await {
                Ok(true) => report.models_updated += 1,
                Ok(false) => report.models_unchanged += 1,
                Err(message) => {
                    warn!(provider = %input.provider, model = %input.model, error = %message, "pricing update failed");
                    report.errors.push(format!("{}/{}: {message}", input.provider, input.model));
                }
            }
        }

        info!(
            fetched = fetched.len(),
            updated = report.models_updated,
            unchanged = report.models_unchanged,
            errors = report.errors.len(),
            "pricing sync completed"
        );
        report
    }

    /// Applies one fetched row; returns whether a row was created.
    async fn apply(&self, input: &PricingConfigInput) -> Result<bool, String> {
        let current = self
            .ledger
            .find_active(&input.provider, &input.model)
            .await
            .map_err(|e| e.to_string())?;

        if !price_changed(current.as_ref(), input) {
            debug!(provider = %input.provider, model = %input.model, "pricing unchanged");
            return Ok(false);
        }

        match current {
            Some(active) => {
                let created = self
                    .ledger
                    .supersede(&active, input)
                    .await
                    .map_err(|e| e.to_string())?;
                info!(
                    provider = %created.provider,
                    model = %created.model,
                    previous_id = %active.id,
                    new_id = %created.id,
                    "pricing superseded"
                );
            }
            None => {
                let created = self.ledger.create(input).await.map_err(|e| e.to_string())?;
                info!(provider = %created.provider, model = %created.model, new_id = %created.id, "pricing created");
            }
        }
        Ok(true)
    }
}
