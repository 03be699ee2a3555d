//! Storage and provider seams for AI pricing.

use async_trait::async_trait;
use chrono::Utc;
use tally_shared::config::StaticPrice;
use tally_shared::types::{CurrencyCode, PricingConfigId};
use thiserror::Error;

use super::types::{PricingConfig, PricingConfigInput};
use crate::error::{ProviderError, StoreError};

/// Which half of a supersede failed.
#[derive(Debug, Clone, Error)]
pub enum SupersedeError {
    /// The current row could not be deactivated; nothing was created.
    #[error("Failed to deactivate current pricing: {0}")]
    Deactivate(StoreError),

    /// The current row was deactivated but the replacement was not created.
    #[error("Failed to create replacement pricing: {0}")]
    Create(StoreError),
}

/// Versioned price rows per (provider, model).
#[async_trait]
pub trait PricingLedger: Send + Sync {
    /// The active row for (provider, model), if any.
    async fn find_active(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Option<PricingConfig>, StoreError>;

    /// Marks a row inactive.
    async fn deactivate(&self, id: PricingConfigId) -> Result<(), StoreError>;

    /// Inserts a new active row.
    async fn create(&self, input: &PricingConfigInput) -> Result<PricingConfig, StoreError>;

    /// Replaces `current` with a new active row built from `replacement`.
    ///
    /// The default deactivates first and only creates when that succeeded.
    /// Stores with transactions should override this to do both atomically.
    async fn supersede(
        &self,
        current: &PricingConfig,
        replacement: &PricingConfigInput,
    ) -> Result<PricingConfig, SupersedeError> {
        self.deactivate(current.id)
            .await
            .map_err(SupersedeError::Deactivate)?;
        self.create(replacement).await.map_err(SupersedeError::Create)
    }
}

/// External source of current AI prices.
#[async_trait]
pub trait PricingProvider: Send + Sync {
    /// Fetches the current price of every model the provider knows.
    async fn fetch(&self) -> Result<Vec<PricingConfigInput>, ProviderError>;
}

/// Pricing provider backed by a fixed table, usually from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPricingProvider {
    prices: Vec<StaticPrice>,
}

impl StaticPricingProvider {
    /// Creates a provider publishing `prices`.
    #[must_use]
    pub fn new(prices: Vec<StaticPrice>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl PricingProvider for StaticPricingProvider {
    async fn fetch(&self) -> Result<Vec<PricingConfigInput>, ProviderError> {
        let now = Utc::now();
        Ok(self
            .prices
            .iter()
            .map(|price| PricingConfigInput {
                provider: price.provider.clone(),
                model: price.model.clone(),
                input_token_price: price.input_token_price,
                output_token_price: price.output_token_price,
                currency: CurrencyCode::normalize(&price.currency),
                effective_date: now,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryPricingLedger;
    use rust_decimal_macros::dec;
    use tally_shared::config::PricingFeedConfig;

    #[tokio::test]
    async fn test_static_provider_publishes_configured_rows() {
        let provider = StaticPricingProvider::new(PricingFeedConfig::default().static_prices);

        let rows = provider.fetch().await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider, "gemini");
        assert_eq!(rows[0].input_token_price, dec!(0.000000075));
        assert_eq!(rows[0].currency, "USD");
    }

    #[tokio::test]
    async fn test_default_supersede_skips_create_when_deactivate_fails() {
        let ledger = InMemoryPricingLedger::default();
        let current = ledger
            .create(&PricingConfigInput::new("gemini", "flash", dec!(0.1), dec!(0.2)))
            .await
            .unwrap();
        ledger.fail_deactivate(true);

        let err = ledger
            .supersede(
                &current,
                &PricingConfigInput::new("gemini", "flash", dec!(0.3), dec!(0.4)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SupersedeError::Deactivate(_)));
        assert_eq!(ledger.rows().len(), 1);
        assert!(ledger.rows()[0].is_active);
    }
}
