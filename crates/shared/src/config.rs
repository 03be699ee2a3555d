//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::CurrencyCode;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Currency normalization configuration.
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// AI backend configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// AI pricing feed configuration.
    #[serde(default)]
    pub pricing: PricingFeedConfig,
    /// Cost metering worker configuration.
    #[serde(default)]
    pub cost_meter: CostMeterConfig,
    /// Scheduled job intervals.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Currency normalization configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Home currency used when neither the request nor the user sets one.
    pub default_home_currency: CurrencyCode,
    /// Target symbols fetched whenever rates for a base currency are requested.
    pub tracked_symbols: Vec<CurrencyCode>,
    /// Base currencies refreshed by the scheduled rate refresh.
    pub refresh_bases: Vec<CurrencyCode>,
    /// Base URL of the exchange rate provider.
    pub provider_url: String,
    /// HTTP timeout for provider requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            default_home_currency: code("TWD"),
            tracked_symbols: ["TWD", "USD", "JPY", "EUR", "CNY", "HKD", "KRW", "GBP"]
                .into_iter()
                .map(code)
                .collect(),
            refresh_bases: ["USD", "TWD"].into_iter().map(code).collect(),
            provider_url: "https://open.er-api.com/v6".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// AI backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key; when absent the deterministic parser is used exclusively.
    pub api_key: Option<String>,
    /// Provider name recorded in cost logs.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

/// AI pricing feed configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingFeedConfig {
    /// Remote JSON feed of prices; when set it takes precedence over `static_prices`.
    pub feed_url: Option<String>,
    /// Price rows published by the static provider.
    pub static_prices: Vec<StaticPrice>,
}

impl Default for PricingFeedConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            static_prices: vec![StaticPrice {
                provider: "gemini".to_string(),
                model: "gemini-2.0-flash-lite".to_string(),
                input_token_price: Decimal::new(75, 9),
                output_token_price: Decimal::new(3, 7),
                currency: "USD".to_string(),
            }],
        }
    }
}

/// One statically configured price row (prices are per token).
#[derive(Debug, Clone, Deserialize)]
pub struct StaticPrice {
    /// Provider name (e.g. "gemini").
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Price per input token.
    pub input_token_price: Decimal,
    /// Price per output token.
    pub output_token_price: Decimal,
    /// Currency the prices are quoted in.
    #[serde(default = "default_price_currency")]
    pub currency: String,
}

fn default_price_currency() -> String {
    "USD".to_string()
}

/// Cost metering worker configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostMeterConfig {
    /// Maximum number of buffered cost events before new ones are dropped.
    pub queue_capacity: usize,
    /// Deadline for a single cost log write, in milliseconds.
    pub write_timeout_ms: u64,
}

impl Default for CostMeterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            write_timeout_ms: 5_000,
        }
    }
}

/// Scheduled job intervals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between pricing syncs, in seconds.
    pub pricing_sync_interval_secs: u64,
    /// Interval between exchange rate refreshes, in seconds.
    pub rate_refresh_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pricing_sync_interval_secs: 86_400, // daily
            rate_refresh_interval_secs: 3_600,  // hourly
        }
    }
}

fn code(value: &'static str) -> CurrencyCode {
    CurrencyCode::from_static(value)
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("currency.tracked_symbols")
                    .with_list_parse_key("currency.refresh_bases"),
            )
            .build()?;

        config.try_deserialize()
    }
}
