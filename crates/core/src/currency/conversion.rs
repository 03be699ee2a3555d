//! Currency conversion arithmetic.
//!
//! Converted amounts are rounded to [`CONVERSION_SCALE`] decimal places with
//! banker's rounding (round half to even), so repeated conversions do not
//! drift in one direction.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places kept on converted home-currency amounts.
pub const CONVERSION_SCALE: u32 = 4;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
/// Returns `None` when the product does not fit in a `Decimal`.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Option<Decimal> {
    let converted = amount.checked_mul(rate)?;
    Some(converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven))
}

/// Converts at the standard [`CONVERSION_SCALE`].
#[must_use]
pub fn convert(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    convert_amount(amount, rate, CONVERSION_SCALE)
}

/// Rate implied by a pre-converted amount (`home / original`), or `None` for a zero original.
#[must_use]
pub fn implied_rate(original: Decimal, home: Decimal) -> Option<Decimal> {
    if original.is_zero() {
        None
    } else {
        home.checked_div(original)
    }
}
