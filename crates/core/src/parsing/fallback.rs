//! Deterministic expense extraction used when the AI backend cannot help.
//!
//! Three pattern families are tried in priority order and the first family
//! that matches anything wins; later families are never merged in:
//!
//! 1. `description$amount` (also `NT$`, `US$`, full-width `＄`; prefixes are uppercase only)
//! 2. `description amount <currency word>` ("午餐 120元", "taxi 15 usd")
//! 3. loose `description amount`

use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tracing::debug;

use super::candidate::ParsedExpenseCandidate;

static DOLLAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<desc>[^\s\d$＄][^$＄]*?)\s*(?P<prefix>NT|US)?[$＄]\s*(?P<amount>\d[\d,]*(?:\.\d+)?)",
    )
    .expect("dollar pattern is valid")
});

static CURRENCY_WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<desc>\S.*?)\s*(?P<amount>\d[\d,]*(?:\.\d+)?)\s*(?P<word>元|塊|块|日圓|日元|円|人民幣|人民币|twd|ntd|usd|dollars?|jpy|yen|eur|euros?|rmb|cny)",
    )
    .expect("currency word pattern is valid")
});

static LOOSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<desc>[^\s\d][^\d]*?)\s*(?P<amount>\d[\d,]*(?:\.\d+)?)")
        .expect("loose pattern is valid")
});

/// Characters stripped from both ends of an extracted description.
const DESCRIPTION_TRIM: &[char] = &[',', '，', ';', '；', '、', ':', '：', '.', '。', '-'];

/// Which pattern family produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    /// `description$amount`.
    Dollar,
    /// `description amount <currency word>`.
    CurrencyWord,
    /// `description amount`.
    Loose,
}

/// Regex-based expense extraction.
pub struct FallbackParser;

impl FallbackParser {
    /// Extracts candidates from `text`.
    ///
    /// Amounts without an explicit currency are recorded in `default_currency`.
    /// Candidates carry no date; the caller resolves it from the whole message.
    #[must_use]
    pub fn parse(text: &str, default_currency: &str) -> Vec<ParsedExpenseCandidate> {
        Self::parse_with_family(text, default_currency)
            .map(|(_, candidates)| candidates)
            .unwrap_or_default()
    }

    /// Like [`FallbackParser::parse`] but also reports the winning family.
    ///
    /// Returns `None` when no family produced a candidate.
    #[must_use]
    pub fn parse_with_family(
        text: &str,
        default_currency: &str,
    ) -> Option<(PatternFamily, Vec<ParsedExpenseCandidate>)> {
        let families: [(PatternFamily, &Regex); 3] = [
            (PatternFamily::Dollar, &DOLLAR_PATTERN),
            (PatternFamily::CurrencyWord, &CURRENCY_WORD_PATTERN),
            (PatternFamily::Loose, &LOOSE_PATTERN),
        ];

        families.into_iter().find_map(|(family, pattern)| {
            let candidates: Vec<_> = pattern
                .captures_iter(text)
                .filter_map(|caps| Self::candidate(family, &caps, default_currency))
                .collect();
            if candidates.is_empty() {
                None
            } else {
                debug!(?family, count = candidates.len(), "fallback pattern matched");
                Some((family, candidates))
            }
        })
    }

    fn candidate(
        family: PatternFamily,
        caps: &Captures<'_>,
        default_currency: &str,
    ) -> Option<ParsedExpenseCandidate> {
        let description = clean_description(caps.name("desc")?.as_str());
        if description.is_empty() {
            return None;
        }
        let amount = parse_amount(caps.name("amount")?.as_str())?;

        let (currency, original) = match family {
            PatternFamily::Dollar => {
                let prefix = caps.name("prefix").map(|m| m.as_str());
                let currency = prefix
                    .and_then(currency_for_word)
                    .unwrap_or(default_currency);
                (currency, format!("{}$", prefix.unwrap_or_default()))
            }
            PatternFamily::CurrencyWord => {
                let word = caps.name("word")?.as_str();
                (
                    currency_for_word(word).unwrap_or(default_currency),
                    word.to_string(),
                )
            }
            PatternFamily::Loose => (default_currency, String::new()),
        };

        Some(ParsedExpenseCandidate::new(description, amount, currency).with_currency_original(original))
    }
}

fn clean_description(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || DESCRIPTION_TRIM.contains(&c))
        .to_string()
}

/// Parses "1,200.50"; anything `Decimal` cannot hold is discarded.
fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}

/// Maps a currency word or dollar prefix to an ISO code.
fn currency_for_word(word: &str) -> Option<&'static str> {
    match word.to_lowercase().as_str() {
        "nt" | "twd" | "ntd" | "元" | "塊" | "块" => Some("TWD"),
        "us" | "usd" | "dollar" | "dollars" => Some("USD"),
        "jpy" | "yen" | "円" | "日圓" | "日元" => Some("JPY"),
        "eur" | "euro" | "euros" => Some("EUR"),
        "rmb" | "cny" | "人民幣" | "人民币" => Some("CNY"),
        _ => None,
    }
}
