//! Exchange rate types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

/// Exchange rate between two currencies on a given day.
///
/// Rows are immutable: a later fetch for the same pair and day is stored as a
/// new row, and the newest insert wins on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Base currency code.
    pub base_currency: String,
    /// Target currency code.
    pub target_currency: String,
    /// 1 `base_currency` = `rate` `target_currency`.
    pub rate: Decimal,
    /// Day the rate is effective.
    pub rate_date: NaiveDate,
}

impl ExchangeRate {
    /// Creates a new exchange rate, normalizing both codes to upper case.
    #[must_use]
    pub fn new(base_currency: &str, target_currency: &str, rate: Decimal, rate_date: NaiveDate) -> Self {
        Self {
            base_currency: CurrencyCode::normalize(base_currency),
            target_currency: CurrencyCode::normalize(target_currency),
            rate,
            rate_date,
        }
    }

    /// True for the pair `base -> target`, ignoring case.
    #[must_use]
    pub fn is_pair(&self, base: &str, target: &str) -> bool {
        CurrencyCode::same(&self.base_currency, base)
            && CurrencyCode::same(&self.target_currency, target)
    }

    /// Rates must be strictly positive to be stored or used.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.rate > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_normalizes_codes() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let rate = ExchangeRate::new("usd", " twd", dec!(31.5), date);
        assert_eq!(rate.base_currency, "USD");
        assert_eq!(rate.target_currency, "TWD");
        assert!(rate.is_pair("Usd", "twd"));
        assert!(rate.is_pair(" usd ", "TWD\n"));
        assert!(!rate.is_pair("TWD", "USD"));
    }

    #[test]
    fn test_non_positive_rates_are_unusable() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(ExchangeRate::new("USD", "TWD", dec!(31.5), date).is_usable());
        assert!(!ExchangeRate::new("USD", "TWD", Decimal::ZERO, date).is_usable());
        assert!(!ExchangeRate::new("USD", "TWD", dec!(-1), date).is_usable());
    }
}
