//! Cost metering types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{CostLogId, UserId};

use crate::ai::TokenUsage;

/// AI operation being metered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostOperation {
    /// Free-text expense extraction.
    ParseExpense,
    /// Category suggestion for one expense.
    SuggestCategory,
}

impl CostOperation {
    /// Stored name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParseExpense => "parse_expense",
            Self::SuggestCategory => "suggest_category",
        }
    }
}

impl std::fmt::Display for CostOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CostOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parse_expense" => Ok(Self::ParseExpense),
            "suggest_category" => Ok(Self::SuggestCategory),
            other => Err(format!("Unknown cost operation: {other}")),
        }
    }
}

/// One AI call waiting to be metered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEvent {
    /// User the call was made for.
    pub user_id: UserId,
    /// What the call did.
    pub operation: CostOperation,
    /// Provider name used for the price lookup.
    pub provider: String,
    /// Model identifier used for the price lookup.
    pub model: String,
    /// Reported token usage.
    pub usage: Option<TokenUsage>,
}

impl CostEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(
        user_id: UserId,
        operation: CostOperation,
        provider: impl Into<String>,
        model: impl Into<String>,
        usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            user_id,
            operation,
            provider: provider.into(),
            model: model.into(),
            usage,
        }
    }

    /// Usage worth metering: present and non-zero.
    #[must_use]
    pub fn billable_usage(&self) -> Option<TokenUsage> {
        self.usage.filter(|usage| !usage.is_empty())
    }
}

/// Append-only record of what one AI call cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCostLog {
    /// Row identifier.
    pub id: CostLogId,
    /// User the call was made for.
    pub user_id: UserId,
    /// Metered operation.
    pub operation: CostOperation,
    /// Provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
    /// Sum of both.
    pub total_tokens: u64,
    /// Exact cost in `currency`; zero when no price was configured.
    pub cost: Decimal,
    /// Currency of `cost`.
    pub currency: String,
    /// Why the cost is zero, when it is.
    pub cost_note: Option<String>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}
