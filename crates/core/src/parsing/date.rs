//! Relative date resolution ("yesterday", "前天", "last month").

use chrono::{DateTime, Duration, Months, Utc};

/// Shift applied to "now" when a token matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeOffset {
    Days(i64),
    MonthsBack(u32),
}

impl RelativeOffset {
    fn apply(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Days(days) => now + Duration::days(days),
            Self::MonthsBack(months) => now.checked_sub_months(Months::new(months)).unwrap_or(now),
        }
    }
}

/// Relative date tokens in match priority order.
///
/// A row must come before any row whose tokens are substrings of its own
/// ("day before yesterday" before "yesterday", "day after tomorrow" before "tomorrow").
const RELATIVE_DATE_TOKENS: &[(&[&str], RelativeOffset)] = &[
    (
        &["day before yesterday", "day-before-yesterday", "前天"],
        RelativeOffset::Days(-2),
    ),
    (&["yesterday", "昨天"], RelativeOffset::Days(-1)),
    (
        &["day after tomorrow", "day-after-tomorrow", "後天", "后天"],
        RelativeOffset::Days(2),
    ),
    (&["tomorrow", "明天"], RelativeOffset::Days(1)),
    (&["last week", "上週", "上周"], RelativeOffset::Days(-7)),
    (
        &["last month", "上個月", "上个月"],
        RelativeOffset::MonthsBack(1),
    ),
];

/// Resolves relative date phrases in a message to a timestamp.
pub struct DateResolver;

impl DateResolver {
    /// Resolves `text` against the current time.
    #[must_use]
    pub fn resolve(text: &str) -> DateTime<Utc> {
        Self::resolve_at(text, Utc::now())
    }

    /// Resolves `text` against a given "now".
    ///
    /// Matching is case-insensitive and the first token in priority order wins.
    /// Text without a relative date token resolves to `now`.
    #[must_use]
    pub fn resolve_at(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let lowered = text.to_lowercase();
        RELATIVE_DATE_TOKENS
            .iter()
            .find(|(tokens, _)| tokens.iter().any(|token| lowered.contains(token)))
            .map_or(now, |(_, offset)| offset.apply(now))
    }
}
