//! HTTP adapters for the external services the pipeline depends on.
//!
//! - [`GeminiBackend`] implements `AiBackend` over the Gemini `generateContent` API
//! - [`HttpRateProvider`] implements `RateProvider` over an open exchange rate feed
//! - [`HttpPricingProvider`] implements `PricingProvider` over a JSON price list
//!
//! [`ai_backend`] and [`pricing_provider`] pick an implementation from
//! [`AppConfig`](tally_shared::AppConfig) sections.

mod error;
pub mod gemini;
mod http;
pub mod pricing;
pub mod rates;

use std::sync::Arc;
use std::time::Duration;

use tally_core::ai::{AiBackend, DisabledAiBackend};
use tally_core::pricing::{PricingProvider, StaticPricingProvider};
use tally_shared::config::{AiConfig, PricingFeedConfig};
use tracing::info;

pub use error::BuildError;
pub use gemini::GeminiBackend;
pub use pricing::HttpPricingProvider;
pub use rates::HttpRateProvider;

/// Builds the AI backend: Gemini when an API key is configured, disabled otherwise.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn ai_backend(config: &AiConfig) -> Result<Arc<dyn AiBackend>, BuildError> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            info!(provider = %config.provider, model = %config.model, "AI backend enabled");
            Ok(Arc::new(GeminiBackend::new(config, key)?))
        }
        _ => {
            info!("no AI API key configured, using deterministic parsing only");
            Ok(Arc::new(DisabledAiBackend))
        }
    }
}

/// Builds the pricing provider: the remote feed when a URL is set, the static table otherwise.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn pricing_provider(
    config: &PricingFeedConfig,
    timeout: Duration,
) -> Result<Arc<dyn PricingProvider>, BuildError> {
    match config.feed_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            info!(url, "using remote pricing feed");
            Ok(Arc::new(HttpPricingProvider::new(url, timeout)?))
        }
        _ => {
            info!(rows = config.static_prices.len(), "using static pricing table");
            Ok(Arc::new(StaticPricingProvider::new(config.static_prices.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_selects_disabled_backend() {
        let backend = ai_backend(&AiConfig::default()).unwrap();
        assert_eq!(backend.provider(), "none");
    }

    #[test]
    fn test_blank_key_selects_disabled_backend() {
        let config = AiConfig {
            api_key: Some("  ".to_string()),
            ..AiConfig::default()
        };
        assert_eq!(ai_backend(&config).unwrap().provider(), "none");
    }

    #[test]
    fn test_key_selects_gemini() {
        let config = AiConfig {
            api_key: Some("secret".to_string()),
            ..AiConfig::default()
        };
        let backend = ai_backend(&config).unwrap();
        assert_eq!(backend.provider(), "gemini");
        assert_eq!(backend.model(), "gemini-2.0-flash-lite");
    }

    #[tokio::test]
    async fn test_static_table_used_without_feed_url() {
        let provider = pricing_provider(&PricingFeedConfig::default(), Duration::from_secs(5)).unwrap();
        let rows = provider.fetch().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].model, "gemini-2.0-flash-lite");
    }
}
