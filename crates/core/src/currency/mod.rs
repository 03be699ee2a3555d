//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod service;
pub mod store;

pub use conversion::{CONVERSION_SCALE, convert, convert_amount, implied_rate};
pub use error::CurrencyError;
pub use exchange::ExchangeRate;
pub use service::{Conversion, CurrencyNormalizer, RateRefreshReport};
pub use store::{ExchangeRateStore, RateProvider};
