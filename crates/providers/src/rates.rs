//! Exchange rate feed adapter.
//!
//! Talks to an open.er-api.com style endpoint: `GET {base_url}/latest/{BASE}`
//! answers with every rate quoted against `BASE` in one document.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::value::RawValue;
use tally_core::ProviderError;
use tally_core::currency::{ExchangeRate, RateProvider};
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::http;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    rates: HashMap<String, Box<RawValue>>,
}

/// HTTP exchange rate provider.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateProvider {
    /// Creates a provider for the feed at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BuildError> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn rate_date(time_last_update_unix: Option<i64>) -> NaiveDate {
    time_last_update_unix
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
        .date_naive()
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch(&self, base: &str, symbols: &[String]) -> Result<Vec<ExchangeRate>, ProviderError> {
        let base = base.trim().to_ascii_uppercase();
        let url = format!("{}/latest/{base}", self.base_url);
        debug!(%url, symbols = symbols.len(), "fetching exchange rates");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error(&e))?;
        if !response.status().is_success() {
            return Err(http::status_error(response).await);
        }

        let body: LatestResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if body.result != "success" {
            return Err(ProviderError::InvalidResponse(format!(
                "provider reported {}: {}",
                body.result,
                body.error_type.unwrap_or_default()
            )));
        }

        let date = rate_date(body.time_last_update_unix);
        let mut rates = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.trim().to_ascii_uppercase();
            if symbol == base {
                continue;
            }
            match body.rates.get(&symbol).and_then(|raw| http::decimal_from_raw(raw)) {
                Some(rate) => rates.push(ExchangeRate::new(&base, &symbol, rate, date)),
                None => warn!(%base, %symbol, "rate missing from provider response"),
            }
        }
        Ok(rates)
    }
}
