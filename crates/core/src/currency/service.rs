//! Currency normalization service.
//!
//! Rates are resolved through a cache-then-fetch chain:
//!
//! 1. exact-date cache hit
//! 2. most recent cached rate on or before the requested date
//! 3. batch fetch from the provider for the base currency, store every
//!    returned rate, then retry the exact-date lookup
//!
//! The normalizer never swallows resolution errors. Callers decide on a
//! fallback (the expense assembler records the original amount at rate 1).

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::CurrencyCode;
use tracing::{debug, info, warn};

use super::conversion::convert;
use super::error::CurrencyError;
use super::exchange::ExchangeRate;
use super::store::{ExchangeRateStore, RateProvider};

/// Result of converting an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// Converted amount, rounded to four decimal places.
    pub amount: Decimal,
    /// Rate used (1 source = `rate` target).
    pub rate: Decimal,
}

impl Conversion {
    /// The no-op conversion: same amount at rate 1.
    #[must_use]
    pub const fn identity(amount: Decimal) -> Self {
        Self {
            amount,
            rate: Decimal::ONE,
        }
    }
}

/// Outcome of a scheduled rate refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateRefreshReport {
    /// Bases whose fetch succeeded.
    pub bases_refreshed: usize,
    /// Rows written to the cache.
    pub rates_stored: usize,
    /// One message per failed base.
    pub errors: Vec<String>,
}

/// Converts amounts between currencies using cached or freshly fetched rates.
pub struct CurrencyNormalizer {
    store: Arc<dyn ExchangeRateStore>,
    provider: Arc<dyn RateProvider>,
    tracked_symbols: Vec<String>,
    refresh_bases: Vec<String>,
}

impl CurrencyNormalizer {
    /// Creates a normalizer.
    ///
    /// `tracked_symbols` are fetched together whenever the provider is asked
    /// for a base currency, so one request warms the cache for every pair.
    #[must_use]
    pub fn new(
        store: Arc<dyn ExchangeRateStore>,
        provider: Arc<dyn RateProvider>,
        tracked_symbols: Vec<String>,
    ) -> Self {
        Self {
            store,
            provider,
            tracked_symbols: normalize_all(tracked_symbols),
            refresh_bases: Vec::new(),
        }
    }

    /// Sets the base currencies refreshed by [`CurrencyNormalizer::refresh_rates`].
    #[must_use]
    pub fn with_refresh_bases(mut self, bases: Vec<String>) -> Self {
        self.refresh_bases = normalize_all(bases);
        self
    }

    /// Converts `amount` from `from` to `to` using the rate effective on `as_of`.
    ///
    /// Identical currencies (ignoring case) and zero amounts short-circuit to
    /// rate 1 without any lookup.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError` when no rate can be resolved, when the cache
    /// or provider fails, or when the converted amount overflows.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> Result<Conversion, CurrencyError> {
        if CurrencyCode::same(from, to) || amount.is_zero() {
            return Ok(Conversion::identity(amount));
        }

        let rate = self.resolve_rate(from, to, as_of).await?;
        let converted = convert(amount, rate).ok_or_else(|| CurrencyError::Overflow {
            from: CurrencyCode::normalize(from),
            to: CurrencyCode::normalize(to),
        })?;
        Ok(Conversion {
            amount: converted,
            rate,
        })
    }

    /// Resolves the `from -> to` rate effective on `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::RateUnavailable` when neither cache nor
    /// provider has the pair, or the underlying store/provider error.
    pub async fn resolve_rate(
        &self,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> Result<Decimal, CurrencyError> {
        let from = CurrencyCode::normalize(from);
        let to = CurrencyCode::normalize(to);

        if let Some(rate) = self.cached_exact(&from, &to, as_of).await? {
            debug!(%from, %to, %as_of, "exchange rate cache hit");
            return Ok(rate);
        }

        if let Some(cached) = self
            .store
            .find_latest_on_or_before(&from, &to, as_of)
            .await?
            .filter(ExchangeRate::is_usable)
        {
            debug!(%from, %to, %as_of, rate_date = %cached.rate_date, "using most recent earlier rate");
            return Ok(cached.rate);
        }

        info!(%from, %to, %as_of, "exchange rate cache miss, fetching from provider");
        let (fetched, _) = self.fetch_and_store(&from, Some(&to)).await?;

        if let Some(rate) = self.cached_exact(&from, &to, as_of).await? {
            return Ok(rate);
        }

        // The provider stamps rates with its own publication date, which may
        // differ from `as_of`.
        fetched
            .iter()
            .find(|rate| rate.is_pair(&from, &to))
            .map(|rate| rate.rate)
            .ok_or(CurrencyError::RateUnavailable {
                from,
                to,
                date: as_of,
            })
    }

    /// Fetches and stores rates for every configured refresh base.
    ///
    /// A failing base is recorded in the report and the remaining bases still run.
    pub async fn refresh_rates(&self) -> RateRefreshReport {
        let mut report = RateRefreshReport::default();

        for base in &self.refresh_bases {
            match self.fetch_and_store(base, None).await {
                Ok((_, stored)) => {
                    report.bases_refreshed += 1;
                    report.rates_stored += stored;
                }
                Err(err) => {
                    warn!(base = %base, error = %err, "exchange rate refresh failed");
                    report.errors.push(format!("{base}: {err}"));
                }
            }
        }

        info!(
            bases_refreshed = report.bases_refreshed,
            rates_stored = report.rates_stored,
            errors = report.errors.len(),
            "exchange rate refresh completed"
        );
        report
    }

    async fn cached_exact(
        &self,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Decimal>, CurrencyError> {
        Ok(self
            .store
            .find_exact(from, to, as_of)
            .await?
            .filter(ExchangeRate::is_usable)
            .map(|rate| rate.rate))
    }

    /// Fetches `base` against all tracked symbols (plus `extra`) and stores the usable rates.
    ///
    /// Returns the usable fetched rates and how many were stored. A failed
    /// insert is logged and skipped; the rate is still returned.
    async fn fetch_and_store(
        &self,
        base: &str,
        extra: Option<&str>,
    ) -> Result<(Vec<ExchangeRate>, usize), CurrencyError> {
        let mut symbols: Vec<String> = self
            .tracked_symbols
            .iter()
            .filter(|symbol| !symbol.eq_ignore_ascii_case(base))
            .cloned()
            .collect();
        if let Some(extra) = extra {
            if !symbols.iter().any(|s| s.eq_ignore_ascii_case(extra)) {
                symbols.push(extra.to_string());
            }
        }

        let fetched = self.provider.fetch(base, &symbols).await?;

        let usable: Vec<ExchangeRate> = fetched
            .into_iter()
            .filter(|rate| rate.is_usable() && rate.base_currency.eq_ignore_ascii_case(base))
            .collect();

        let mut stored = 0;
        for rate in &usable {
            match self.store.insert(rate).await {
                Ok(()) => stored += 1,
                Err(err) => warn!(
                    base = %rate.base_currency,
                    target = %rate.target_currency,
                    error = %err,
                    "failed to cache exchange rate"
                ),
            }
        }

        debug!(base = %base, fetched = usable.len(), stored, "stored fetched exchange rates");
        Ok((usable, stored))
    }
}

fn normalize_all(codes: Vec<String>) -> Vec<String> {
    codes
        .into_iter()
        .map(|code| CurrencyCode::normalize(&code))
        .filter(|code| !code.is_empty())
        .collect()
}
