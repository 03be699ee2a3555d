//! Storage and provider seams for exchange rates.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::exchange::ExchangeRate;
use crate::error::{ProviderError, StoreError};

/// Append-only exchange rate cache.
#[async_trait]
pub trait ExchangeRateStore: Send + Sync {
    /// Newest rate for `base -> target` stamped exactly `date`.
    async fn find_exact(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError>;

    /// Most recent rate for `base -> target` stamped on or before `date`.
    async fn find_latest_on_or_before(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError>;

    /// Inserts a new row; existing rows are never updated.
    async fn insert(&self, rate: &ExchangeRate) -> Result<(), StoreError>;
}

/// External source of exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches rates from `base` to each of `symbols`, in one request where possible.
    async fn fetch(&self, base: &str, symbols: &[String]) -> Result<Vec<ExchangeRate>, ProviderError>;
}
