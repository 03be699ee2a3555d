//! Currency normalization errors.

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::{ProviderError, StoreError};

/// Errors raised while resolving an exchange rate.
#[derive(Debug, Clone, Error)]
pub enum CurrencyError {
    /// Neither the cache nor the provider had a usable rate.
    #[error("No exchange rate from {from} to {to} on {date}")]
    RateUnavailable {
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
        /// Requested date.
        date: NaiveDate,
    },

    /// The converted amount does not fit in a `Decimal`.
    #[error("Converting {from} to {to} overflows")]
    Overflow {
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
    },

    /// The rate cache could not be read.
    #[error("Exchange rate store error: {0}")]
    Store(#[from] StoreError),

    /// The rate provider could not be reached or answered garbage.
    #[error("Exchange rate provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl From<CurrencyError> for tally_shared::AppError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::RateUnavailable { .. } => Self::NotFound(err.to_string()),
            CurrencyError::Overflow { .. } => Self::Validation(err.to_string()),
            CurrencyError::Store(e) => e.into(),
            CurrencyError::Provider(e) => e.into(),
        }
    }
}
