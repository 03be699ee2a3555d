//! Expense domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{CategoryId, ExpenseId, UserId};

use crate::parsing::ParsedExpenseCandidate;

/// A persisted expense with both original and home-currency amounts.
///
/// `home_amount` equals `original_amount * exchange_rate`, rounded to four
/// decimal places with banker's rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Row identifier.
    pub id: ExpenseId,
    /// Owner.
    pub user_id: UserId,
    /// What the money was spent on.
    pub description: String,
    /// Amount as spent, in `currency`.
    pub original_amount: Decimal,
    /// Transaction currency.
    pub currency: String,
    /// Amount in the user's home currency.
    pub home_amount: Decimal,
    /// The user's reporting currency.
    pub home_currency: String,
    /// 1 `currency` = `exchange_rate` `home_currency`; 1 when no conversion happened.
    pub exchange_rate: Decimal,
    /// Category, when one was resolved.
    pub category_id: Option<CategoryId>,
    /// Never empty once persisted.
    pub account: String,
    /// When the money was spent.
    pub expense_date: DateTime<Utc>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A user-defined expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Row identifier.
    pub id: CategoryId,
    /// Owner.
    pub user_id: UserId,
    /// Display name, matched exactly against suggestions.
    pub name: String,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates a category owned by `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            user_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Input to [`ExpenseAssembler::execute`](super::ExpenseAssembler::execute).
///
/// Everything except user, description and amount is optional and resolved
/// by the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    /// Owner.
    pub user_id: UserId,
    /// What the money was spent on.
    pub description: String,
    /// Amount in the transaction currency.
    pub amount: Decimal,
    /// Transaction currency; defaults to the home currency.
    pub currency: Option<String>,
    /// Overrides the user's preferred home currency.
    pub home_currency: Option<String>,
    /// Pre-converted amount, trusted as is.
    pub home_amount: Option<Decimal>,
    /// Rate that produced `home_amount`.
    pub exchange_rate: Option<Decimal>,
    /// Explicit category; skips suggestion.
    pub category_id: Option<CategoryId>,
    /// Category name already suggested upstream; skips the AI call.
    pub suggested_category: Option<String>,
    /// Payment account; empty means cash.
    pub account: String,
    /// Defaults to now.
    pub expense_date: Option<DateTime<Utc>>,
}

impl CreateExpenseRequest {
    /// A minimal request in the home currency.
    #[must_use]
    pub fn new(user_id: UserId, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            user_id,
            description: description.into(),
            amount,
            currency: None,
            home_currency: None,
            home_amount: None,
            exchange_rate: None,
            category_id: None,
            suggested_category: None,
            account: String::new(),
            expense_date: None,
        }
    }

    /// Builds a request from a parsed candidate.
    #[must_use]
    pub fn from_candidate(user_id: UserId, candidate: ParsedExpenseCandidate) -> Self {
        Self {
            currency: Some(candidate.currency).filter(|c| !c.trim().is_empty()),
            suggested_category: candidate
                .suggested_category
                .filter(|c| !c.trim().is_empty()),
            account: candidate.account,
            expense_date: candidate.date,
            ..Self::new(user_id, candidate.description, candidate.amount)
        }
    }

    /// Sets the transaction currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Sets the suggested category name.
    #[must_use]
    pub fn suggested_category(mut self, name: impl Into<String>) -> Self {
        self.suggested_category = Some(name.into());
        self
    }
}

/// A created expense plus the confirmation text for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSummary {
    /// The stored expense.
    pub expense: Expense,
    /// Resolved category name, when known.
    pub category_name: Option<String>,
    /// e.g. "Recorded lunch 3150 TWD (100 USD) [Food]".
    pub message: String,
}
