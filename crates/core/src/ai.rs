//! AI backend seam used for expense extraction and category suggestion.
//!
//! Every call reports token usage alongside its result, even when the call
//! failed, so the cost of failed requests is still metered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;
use thiserror::Error;

use crate::parsing::ParsedExpenseCandidate;

/// Token counts reported by the AI backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Creates a usage record.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Sum of input and output tokens.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.input_tokens as u64 + self.output_tokens as u64
    }

    /// True when no tokens were consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// AI backend errors. None of these are ever shown to the user.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// No backend is configured.
    #[error("AI backend is disabled")]
    Disabled,

    /// Transport failure or timeout.
    #[error("AI request failed: {0}")]
    Request(String),

    /// The backend answered with an error status.
    #[error("AI backend returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// The backend answered but the payload was not what was asked for.
    #[error("AI response could not be parsed: {0}")]
    InvalidResponse(String),
}

/// Outcome of one AI call: the result plus whatever usage was reported.
#[derive(Debug, Clone)]
pub struct AiCall<T> {
    /// Value or failure.
    pub result: Result<T, AiError>,
    /// Token usage, when the backend reported any.
    pub usage: Option<TokenUsage>,
}

impl<T> AiCall<T> {
    /// A successful call.
    pub fn ok(value: T, usage: Option<TokenUsage>) -> Self {
        Self {
            result: Ok(value),
            usage,
        }
    }

    /// A failed call, possibly after tokens were already consumed.
    pub fn failed(error: AiError, usage: Option<TokenUsage>) -> Self {
        Self {
            result: Err(error),
            usage,
        }
    }
}

/// Structured extraction and categorization backend.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Provider name used to look up pricing (e.g. "gemini").
    fn provider(&self) -> &str;

    /// Model identifier used to look up pricing.
    fn model(&self) -> &str;

    /// Extracts expense candidates from a chat message.
    async fn parse_expense(
        &self,
        text: &str,
        user_id: &UserId,
    ) -> AiCall<Vec<ParsedExpenseCandidate>>;

    /// Suggests a category name for an expense description.
    async fn suggest_category(&self, description: &str, user_id: &UserId) -> AiCall<String>;
}

/// Backend used when no API key is configured; always fails without usage.
#[derive(Debug, Clone, Default)]
pub struct DisabledAiBackend;

#[async_trait]
impl AiBackend for DisabledAiBackend {
    fn provider(&self) -> &str {
        "none"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn parse_expense(
        &self,
        _text: &str,
        _user_id: &UserId,
    ) -> AiCall<Vec<ParsedExpenseCandidate>> {
        AiCall::failed(AiError::Disabled, None)
    }

    async fn suggest_category(&self, _description: &str, _user_id: &UserId) -> AiCall<String> {
        AiCall::failed(AiError::Disabled, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total_does_not_overflow() {
        let usage = TokenUsage::new(u32::MAX, u32::MAX);
        assert_eq!(usage.total(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_usage_is_empty() {
        assert!(TokenUsage::default().is_empty());
        assert!(!TokenUsage::new(0, 1).is_empty());
    }

    #[tokio::test]
    async fn test_disabled_backend_reports_no_usage() {
        let backend = DisabledAiBackend;
        let call = backend.parse_expense("lunch $30", &UserId::from("u1")).await;
        assert!(matches!(call.result, Err(AiError::Disabled)));
        assert!(call.usage.is_none());
    }
}
