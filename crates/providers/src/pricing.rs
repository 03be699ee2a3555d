//! Remote AI pricing feed adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::value::RawValue;
use tally_core::ProviderError;
use tally_core::pricing::{PricingConfigInput, PricingProvider};
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::http;

/// One row of the feed. Prices are kept raw so they never pass through `f64`.
#[derive(Debug, Deserialize)]
struct FeedRow {
    provider: String,
    model: String,
    input_token_price: Box<RawValue>,
    output_token_price: Box<RawValue>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    effective_date: Option<DateTime<Utc>>,
}

/// Pricing provider reading a JSON array of price rows from a URL.
#[derive(Debug, Clone)]
pub struct HttpPricingProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpPricingProvider {
    /// Creates a provider for the feed at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, BuildError> {
        Ok(Self {
            client: http::client(timeout)?,
            url: url.to_string(),
        })
    }
}

fn price(raw: &RawValue) -> Option<Decimal> {
    http::decimal_from_raw(raw).filter(|p| !p.is_sign_negative())
}

fn to_input(row: FeedRow, fetched_at: DateTime<Utc>) -> Option<PricingConfigInput> {
    let provider = row.provider.trim();
    let model = row.model.trim();
    if provider.is_empty() || model.is_empty() {
        return None;
    }
    let (Some(input), Some(output)) = (price(&row.input_token_price), price(&row.output_token_price)) else {
        warn!(provider, model, "skipping pricing row with unreadable price");
        return None;
    };

    Some(PricingConfigInput {
        provider: provider.to_string(),
        model: model.to_string(),
        input_token_price: input,
        output_token_price: output,
        currency: row
            .currency
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "USD".to_string()),
        effective_date: row.effective_date.unwrap_or(fetched_at),
    })
}

#[async_trait]
impl PricingProvider for HttpPricingProvider {
    async fn fetch(&self) -> Result<Vec<PricingConfigInput>, ProviderError> {
        debug!(url = %self.url, "fetching pricing feed");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| http::request_error(&e))?;
        if !response.status().is_success() {
            return Err(http::status_error(response).await);
        }

        let rows: Vec<FeedRow> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let fetched_at = Utc::now();
        Ok(rows
            .into_iter()
            .filter_map(|row| to_input(row, fetched_at))
            .collect())
    }
}
