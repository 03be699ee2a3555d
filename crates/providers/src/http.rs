//! Shared HTTP plumbing for the adapters.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use serde_json::value::RawValue;
use tally_core::ProviderError;

/// Builds a client with the given request timeout.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn request_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Request(format!("timed out: {err}"))
    } else {
        ProviderError::Request(err.to_string())
    }
}

/// Reads the body of a non-success response into a status error.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ProviderError::Status { status, message }
}

/// Parses a decimal from its JSON text without going through `f64`.
///
/// Accepts plain and scientific notation, quoted or not.
pub(crate) fn decimal_from_text(text: &str) -> Option<Decimal> {
    let text = text.trim().trim_matches('"').trim().replace(',', "");
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

pub(crate) fn decimal_from_raw(raw: &RawValue) -> Option<Decimal> {
    decimal_from_text(raw.get())
}

/// Decimal from a JSON number or numeric string.
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_text(&n.to_string()),
        Value::String(s) => decimal_from_text(s),
        _ => None,
    }
}
