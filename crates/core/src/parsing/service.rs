//! Conversation parsing service.
//!
//! Turns one chat message into an ordered list of expense candidates. The AI
//! backend is asked first; the deterministic fallback takes over when the AI
//! call fails or yields nothing usable. This service never fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_shared::types::{CurrencyCode, UserId};
use tracing::{debug, info, warn};

use super::candidate::{DEFAULT_ACCOUNT, ParsedExpenseCandidate};
use super::date::DateResolver;
use super::fallback::FallbackParser;
use crate::ai::AiBackend;
use crate::cost::{CostEvent, CostMeterHandle, CostOperation};

/// Parses free-text messages into expense candidates.
pub struct ConversationParser {
    ai: Arc<dyn AiBackend>,
    cost_meter: CostMeterHandle,
    default_currency: String,
}

impl ConversationParser {
    /// Creates a parser.
    ///
    /// `default_currency` is used for amounts that do not name a currency.
    #[must_use]
    pub fn new(
        ai: Arc<dyn AiBackend>,
        cost_meter: CostMeterHandle,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            ai,
            cost_meter,
            default_currency: default_currency.into(),
        }
    }

    /// Parses `text` for `user_id`, resolving relative dates against the current time.
    pub async fn execute(&self, text: &str, user_id: &UserId) -> Vec<ParsedExpenseCandidate> {
        self.execute_at(text, user_id, Utc::now()).await
    }

    /// Parses `text` for `user_id`, resolving relative dates against `now`.
    ///
    /// Every candidate without a date gets the one date resolved from the
    /// whole message, so all candidates of a message share it.
    pub async fn execute_at(
        &self,
        text: &str,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Vec<ParsedExpenseCandidate> {
        let call = self.ai.parse_expense(text, user_id).await;

        self.cost_meter.dispatch(CostEvent::new(
            user_id.clone(),
            CostOperation::ParseExpense,
            self.ai.provider(),
            self.ai.model(),
            call.usage,
        ));

        let mut candidates = match call.result {
            Ok(candidates) => self.sanitize(candidates),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "AI parsing failed, using fallback patterns");
                Vec::new()
            }
        };

        if candidates.is_empty() {
            candidates = FallbackParser::parse(text, &self.default_currency);
            debug!(user_id = %user_id, count = candidates.len(), "fallback parser result");
        }

        if candidates.iter().any(|c| c.date.is_none()) {
            let resolved = DateResolver::resolve_at(text, now);
            for candidate in candidates.iter_mut().filter(|c| c.date.is_none()) {
                candidate.date = Some(resolved);
            }
        }

        info!(user_id = %user_id, count = candidates.len(), "parsed expense candidates");
        candidates
    }

    /// Drops unusable AI candidates and fills blank currency and account.
    /// A currency that is not a three-letter code becomes the default currency.
    fn sanitize(&self, candidates: Vec<ParsedExpenseCandidate>) -> Vec<ParsedExpenseCandidate> {
        candidates
            .into_iter()
            .filter_map(|mut candidate| {
                candidate.description = candidate.description.trim().to_string();
                if candidate.description.is_empty() {
                    return None;
                }
                match candidate.currency.parse::<CurrencyCode>() {
                    Ok(code) => candidate.currency = code.into(),
                    Err(_) => {
                        if !candidate.currency.trim().is_empty() {
                            debug!(currency = %candidate.currency, "unrecognised AI currency, using default");
                        }
                        candidate.currency.clone_from(&self.default_currency);
                    }
                }
                if candidate.account.trim().is_empty() {
                    candidate.account = DEFAULT_ACCOUNT.to_string();
                }
                Some(candidate)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiCall, AiError, DisabledAiBackend, TokenUsage};
    use crate::testing::{ScriptedAi, recording_cost_meter};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    fn user() -> UserId {
        UserId::from("line:U123")
    }

    #[tokio::test]
    async fn test_ai_disabled_uses_fallback_dated_now() {
        let parser =
            ConversationParser::new(Arc::new(DisabledAiBackend), CostMeterHandle::detached(), "TWD");

        let candidates = parser
            .execute_at("breakfast $20 lunch $30", &user(), now())
            .await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].description, "breakfast");
        assert_eq!(candidates[0].amount, dec!(20));
        assert_eq!(candidates[1].description, "lunch");
        assert_eq!(candidates[1].amount, dec!(30));
        assert!(candidates.iter().all(|c| c.date == Some(now())));
    }

    #[tokio::test]
    async fn test_all_fallback_candidates_share_resolved_date() {
        let parser =
            ConversationParser::new(Arc::new(DisabledAiBackend), CostMeterHandle::detached(), "TWD");

        let candidates = parser
            .execute_at("昨天 早餐$60 午餐$120", &user(), now())
            .await;

        assert_eq!(candidates.len(), 2);
        let yesterday = now() - Duration::days(1);
        assert!(candidates.iter().all(|c| c.date == Some(yesterday)));
    }

    #[tokio::test]
    async fn test_ai_candidates_are_sanitized() {
        let mut blank = ParsedExpenseCandidate::new("  taxi ", dec!(15), " ");
        blank.account = String::new();
        let empty = ParsedExpenseCandidate::new("   ", dec!(5), "USD");
        let mut dated = ParsedExpenseCandidate::new("hotel", dec!(120), "usd");
        let stay = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        dated.date = Some(stay);

        let ai = ScriptedAi::new().with_parse(AiCall::ok(vec![blank, empty, dated], None));
        let parser = ConversationParser::new(Arc::new(ai), CostMeterHandle::detached(), "TWD");

        let candidates = parser.execute_at("taxi and hotel", &user(), now()).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].description, "taxi");
        assert_eq!(candidates[0].currency, "TWD");
        assert_eq!(candidates[0].account, DEFAULT_ACCOUNT);
        assert_eq!(candidates[0].date, Some(now()));
        assert_eq!(candidates[1].currency, "USD");
        assert_eq!(candidates[1].date, Some(stay));
    }

    #[tokio::test]
    async fn test_ai_currency_that_is_not_a_code_uses_default() {
        let ai = ScriptedAi::new().with_parse(AiCall::ok(
            vec![
                ParsedExpenseCandidate::new("taxi", dec!(15), "dollars"),
                ParsedExpenseCandidate::new("snack", dec!(3), "U$"),
                ParsedExpenseCandidate::new("ramen", dec!(980), " jpy "),
            ],
            None,
        ));
        let parser = ConversationParser::new(Arc::new(ai), CostMeterHandle::detached(), "TWD");

        let candidates = parser.execute_at("taxi snack ramen", &user(), now()).await;

        let currencies: Vec<_> = candidates.iter().map(|c| c.currency.as_str()).collect();
        assert_eq!(currencies, vec!["TWD", "TWD", "JPY"]);
    }

    #[tokio::test]
    async fn test_ai_empty_result_falls_back() {
        let ai = ScriptedAi::new().with_parse(AiCall::ok(Vec::new(), Some(TokenUsage::new(40, 2))));
        let parser = ConversationParser::new(Arc::new(ai), CostMeterHandle::detached(), "TWD");

        let candidates = parser.execute_at("coffee 80元", &user(), now()).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description, "coffee");
        assert_eq!(candidates[0].currency_original, "元");
    }

    #[tokio::test]
    async fn test_failed_ai_call_is_still_metered() {
        let (cost_meter, mut events) = recording_cost_meter(4);
        let ai = ScriptedAi::new().with_parse(AiCall::failed(
            AiError::InvalidResponse("not json".to_string()),
            Some(TokenUsage::new(100, 50)),
        ));
        let parser = ConversationParser::new(Arc::new(ai), cost_meter, "TWD");

        let candidates = parser.execute_at("lunch $30", &user(), now()).await;
        assert_eq!(candidates.len(), 1);

        let event = events.try_recv().unwrap();
        assert_eq!(event.operation, CostOperation::ParseExpense);
        assert_eq!(event.usage, Some(TokenUsage::new(100, 50)));
        assert_eq!(event.user_id, user());
    }

    #[tokio::test]
    async fn test_unparsable_text_returns_empty() {
        let parser =
            ConversationParser::new(Arc::new(DisabledAiBackend), CostMeterHandle::detached(), "TWD");

        assert!(parser.execute_at("hello there", &user(), now()).await.is_empty());
    }
}
