//! Gemini `generateContent` backend.
//!
//! Both operations ask for a JSON response (`responseMimeType`) and read the
//! first candidate's text part. Token usage comes from `usageMetadata` and is
//! returned even when the payload turns out to be unusable.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::ai::{AiBackend, AiCall, AiError, TokenUsage};
use tally_core::parsing::ParsedExpenseCandidate;
use tally_shared::config::AiConfig;
use tally_shared::types::UserId;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::http;

const PARSE_PROMPT: &str = "Extract every expense from the chat message below. \
Answer with a JSON array only. Each element is an object with the keys \
\"description\" (string), \"amount\" (number), \"currency\" (ISO 4217 code, \
empty string if the message does not say), \"account\" (payment account, empty \
string if not mentioned) and \"category\" (short category name or null). \
Return [] when the message contains no expense.\n\nMessage:\n";

const CATEGORY_PROMPT: &str = "Suggest one short category name (for example Food, \
Transport, Shopping, Entertainment, Bills) for the expense below. Answer with a \
JSON object {\"category\": \"<name>\"} only.\n\nExpense:\n";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateResponse {
    fn usage(&self) -> Option<TokenUsage> {
        self.usage_metadata
            .as_ref()
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
    }

    fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }
}

/// Gemini AI backend.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    provider: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Creates a backend from the `ai` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AiConfig, api_key: &str) -> Result<Self, BuildError> {
        Ok(Self {
            client: http::client(Duration::from_secs(config.timeout_secs))?,
            api_key: api_key.to_string(),
            provider: config.provider.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one prompt and returns the response text with its usage.
    async fn generate(&self, prompt: &str) -> (Result<String, AiError>, Option<TokenUsage>) {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.1,
            },
        };

        let response = match self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return (Err(AiError::Request(err.to_string())), None),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "AI backend returned an error status");
            return (
                Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                }),
                None,
            );
        }

        let parsed: GenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => return (Err(AiError::InvalidResponse(err.to_string())), None),
        };
        let usage = parsed.usage();
        debug!(model = %self.model, ?usage, "AI response received");

        match parsed.text() {
            Some(text) => (Ok(text.to_string()), usage),
            None => (
                Err(AiError::InvalidResponse("response has no text part".to_string())),
                usage,
            ),
        }
    }
}

/// Reads the expense array, tolerating an `{"expenses": [...]}` wrapper.
fn candidates_from_json(text: &str) -> Result<Vec<ParsedExpenseCandidate>, AiError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("expenses") {
            Some(Value::Array(items)) => items,
            _ => return Err(AiError::InvalidResponse("expected a JSON array".to_string())),
        },
        _ => return Err(AiError::InvalidResponse("expected a JSON array".to_string())),
    };

    Ok(items.iter().filter_map(candidate_from_value).collect())
}

fn candidate_from_value(item: &Value) -> Option<ParsedExpenseCandidate> {
    let field = |key: &str| item.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("");

    let description = field("description");
    let amount = item.get("amount").and_then(http::decimal_from_value)?;
    if description.is_empty() || amount.is_sign_negative() || amount.is_zero() {
        return None;
    }

    let currency = field("currency");
    let mut candidate = ParsedExpenseCandidate::new(description, amount, currency.to_ascii_uppercase())
        .with_currency_original(currency);
    candidate.account = field("account").to_string();
    candidate.suggested_category = Some(field("category"))
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    Some(candidate)
}

fn category_from_json(text: &str) -> Result<String, AiError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    let name = match &value {
        Value::String(name) => name.as_str(),
        Value::Object(map) => map.get("category").and_then(Value::as_str).unwrap_or(""),
        _ => "",
    }
    .trim();

    if name.is_empty() {
        Err(AiError::InvalidResponse("no category in response".to_string()))
    } else {
        Ok(name.to_string())
    }
}

#[async_trait]
impl AiBackend for GeminiBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn parse_expense(
        &self,
        text: &str,
        user_id: &UserId,
    ) -> AiCall<Vec<ParsedExpenseCandidate>> {
        debug!(user_id = %user_id, "requesting expense extraction");
        let (result, usage) = self.generate(&format!("{PARSE_PROMPT}{text}")).await;
        match result.and_then(|body| candidates_from_json(&body)) {
            Ok(candidates) => AiCall::ok(candidates, usage),
            Err(err) => AiCall::failed(err, usage),
        }
    }

    async fn suggest_category(&self, description: &str, user_id: &UserId) -> AiCall<String> {
        debug!(user_id = %user_id, "requesting category suggestion");
        let (result, usage) = self.generate(&format!("{CATEGORY_PROMPT}{description}")).await;
        match result.and_then(|body| category_from_json(&body)) {
            Ok(category) => AiCall::ok(category, usage),
            Err(err) => AiCall::failed(err, usage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> GeminiBackend {
        let config = AiConfig {
            base_url: format!("{}/v1beta/", server.uri()),
            ..AiConfig::default()
        };
        GeminiBackend::new(&config, "test-key").unwrap()
    }

    fn reply(text: &str, prompt_tokens: u32, output_tokens: u32) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
            "usageMetadata": {
                "promptTokenCount": prompt_tokens,
                "candidatesTokenCount": output_tokens,
                "totalTokenCount": prompt_tokens + output_tokens
            }
        }))
    }

    async fn mount(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_parse_expense_reads_candidates_and_usage() {
        let server = MockServer::start().await;
        mount(
            &server,
            reply(
                r#"[{"description":"lunch","amount":150,"currency":"twd","account":"","category":"Food"},
                    {"description":"taxi","amount":"85.5","currency":"","account":"Visa","category":null}]"#,
                120,
                40,
            ),
        )
        .await;

        let call = backend(&server)
            .parse_expense("lunch 150 taxi 85.5", &UserId::from("u1"))
            .await;

        assert_eq!(call.usage, Some(TokenUsage::new(120, 40)));
        let candidates = call.result.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].description, "lunch");
        assert_eq!(candidates[0].amount, dec!(150));
        assert_eq!(candidates[0].currency, "TWD");
        assert_eq!(candidates[0].suggested_category.as_deref(), Some("Food"));
        assert_eq!(candidates[1].amount, dec!(85.5));
        assert_eq!(candidates[1].currency, "");
        assert_eq!(candidates[1].account, "Visa");
        assert_eq!(candidates[1].suggested_category, None);
    }

    #[tokio::test]
    async fn test_unparsable_payload_still_reports_usage() {
        let server = MockServer::start().await;
        mount(&server, reply("sorry, I cannot help", 80, 7)).await;

        let call = backend(&server)
            .parse_expense("hello", &UserId::from("u1"))
            .await;

        assert!(matches!(call.result, Err(AiError::InvalidResponse(_))));
        assert_eq!(call.usage, Some(TokenUsage::new(80, 7)));
    }

    #[tokio::test]
    async fn test_error_status_has_no_usage() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(429).set_body_string("quota")).await;

        let call = backend(&server)
            .parse_expense("lunch 150", &UserId::from("u1"))
            .await;

        assert!(matches!(call.result, Err(AiError::Api { status: 429, .. })));
        assert!(call.usage.is_none());
    }

    #[tokio::test]
    async fn test_suggest_category() {
        let server = MockServer::start().await;
        mount(&server, reply(r#"{"category":" Transport "}"#, 30, 4)).await;

        let call = backend(&server)
            .suggest_category("taxi to airport", &UserId::from("u1"))
            .await;

        assert_eq!(call.result.unwrap(), "Transport");
        assert_eq!(call.usage, Some(TokenUsage::new(30, 4)));
    }

    #[test]
    fn test_wrapped_array_and_invalid_items() {
        let candidates = candidates_from_json(
            r#"{"expenses":[{"description":"coffee","amount":60},
                            {"description":"","amount":10},
                            {"description":"refund","amount":-5},
                            {"description":"gift"}]}"#,
        )
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description, "coffee");
        assert_eq!(candidates[0].account, "");
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert!(candidates_from_json("[]").unwrap().is_empty());
    }
}
