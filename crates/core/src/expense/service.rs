//! Expense assembly service.
//!
//! Combines a request (usually built from a parsed candidate) with category
//! resolution and currency normalization, persists the expense and composes
//! the confirmation message. Only the final insert can fail the call.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{CategoryId, CurrencyCode, ExpenseId};
use tracing::{debug, info, warn};

use super::category::{CategoryResolver, ExactNameResolver};
use super::error::ExpenseError;
use super::store::{CategoryStore, ExpenseStore, UserPreferenceStore};
use super::types::{CreateExpenseRequest, Expense, ExpenseSummary};
use crate::ai::AiBackend;
use crate::cost::{CostEvent, CostMeterHandle, CostOperation};
use crate::currency::{Conversion, CurrencyNormalizer, implied_rate};
use crate::parsing::DEFAULT_ACCOUNT;

/// Repositories the assembler reads and writes.
pub struct ExpenseStores {
    /// Expense persistence.
    pub expenses: Arc<dyn ExpenseStore>,
    /// Category lookup.
    pub categories: Arc<dyn CategoryStore>,
    /// Home currency preferences.
    pub preferences: Arc<dyn UserPreferenceStore>,
}

/// Creates expenses from requests.
pub struct ExpenseAssembler {
    stores: ExpenseStores,
    ai: Arc<dyn AiBackend>,
    normalizer: Arc<CurrencyNormalizer>,
    cost_meter: CostMeterHandle,
    resolver: Arc<dyn CategoryResolver>,
    default_home_currency: String,
}

impl ExpenseAssembler {
    /// Creates an assembler matching category suggestions by exact name.
    #[must_use]
    pub fn new(
        stores: ExpenseStores,
        ai: Arc<dyn AiBackend>,
        normalizer: Arc<CurrencyNormalizer>,
        cost_meter: CostMeterHandle,
        default_home_currency: impl Into<String>,
    ) -> Self {
        Self {
            stores,
            ai,
            normalizer,
            cost_meter,
            resolver: Arc::new(ExactNameResolver),
            default_home_currency: CurrencyCode::normalize(&default_home_currency.into()),
        }
    }

    /// Replaces the category matching strategy.
    #[must_use]
    pub fn with_category_resolver(mut self, resolver: Arc<dyn CategoryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Creates and persists one expense.
    ///
    /// Category and conversion failures are logged and degrade gracefully:
    /// the expense is stored uncategorized, or at rate 1 in its own amount.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::Persistence` if the expense cannot be stored.
    pub async fn execute(&self, request: CreateExpenseRequest) -> Result<ExpenseSummary, ExpenseError> {
        let now = Utc::now();
        let user_id = request.user_id.clone();

        let (category_id, category_name) = self.resolve_category(&request).await;
        let home_currency = self.resolve_home_currency(&request).await;
        let currency = match non_blank(request.currency.as_deref()) {
            Some(code) => currency_code(code).unwrap_or_else(|| {
                warn!(user_id = %user_id, currency = %code, "unrecognised currency, using home currency");
                home_currency.clone()
            }),
            None => home_currency.clone(),
        };
        let expense_date = request.expense_date.unwrap_or(now);

        let conversion = match request.home_amount {
            Some(home_amount) => Conversion {
                amount: home_amount,
                rate: request
                    .exchange_rate
                    .filter(|rate| !rate.is_sign_negative())
                    .or_else(|| {
                        implied_rate(request.amount, home_amount).filter(|rate| !rate.is_sign_negative())
                    })
                    .unwrap_or(Decimal::ONE),
            },
            None => match self
                .normalizer
                .convert(request.amount, &currency, &home_currency, expense_date.date_naive())
                .await
            {
                Ok(conversion) => conversion,
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        from = %currency,
                        to = %home_currency,
                        error = %err,
                        "currency conversion unavailable, recording original amount"
                    );
                    Conversion::identity(request.amount)
                }
            },
        };

        let account = if request.account.trim().is_empty() {
            DEFAULT_ACCOUNT.to_string()
        } else {
            request.account.trim().to_string()
        };

        let expense = Expense {
            id: ExpenseId::new(),
            user_id: user_id.clone(),
            description: request.description.trim().to_string(),
            original_amount: request.amount,
            currency,
            home_amount: conversion.amount,
            home_currency,
            exchange_rate: conversion.rate,
            category_id,
            account,
            expense_date,
            created_at: now,
            updated_at: now,
        };

        let expense = self.stores.expenses.insert(&expense).await?;
        let message = confirmation_message(&expense, category_name.as_deref());

        info!(
            user_id = %user_id,
            expense_id = %expense.id,
            home_amount = %expense.home_amount,
            home_currency = %expense.home_currency,
            categorized = expense.category_id.is_some(),
            "expense recorded"
        );

        Ok(ExpenseSummary {
            expense,
            category_name,
            message,
        })
    }

    async fn resolve_category(
        &self,
        request: &CreateExpenseRequest,
    ) -> (Option<CategoryId>, Option<String>) {
        if let Some(id) = request.category_id {
            let name = match self.stores.categories.find_by_id(id).await {
                Ok(category) => category.map(|c| c.name),
                Err(err) => {
                    warn!(category_id = %id, error = %err, "category lookup failed");
                    None
                }
            };
            return (Some(id), name);
        }

        let Some(suggestion) = self.suggest_category(request).await else {
            return (None, None);
        };

        match self.stores.categories.list_for_user(&request.user_id).await {
            Ok(categories) => match self.resolver.resolve(&suggestion, &categories) {
                Some(category) => (Some(category.id), Some(category.name.clone())),
                None => {
                    debug!(user_id = %request.user_id, suggestion = %suggestion, "no category matches suggestion");
                    (None, None)
                }
            },
            Err(err) => {
                warn!(user_id = %request.user_id, error = %err, "failed to list categories");
                (None, None)
            }
        }
    }

    /// An upstream suggestion is used as is; otherwise the AI backend is asked.
    async fn suggest_category(&self, request: &CreateExpenseRequest) -> Option<String> {
        if let Some(suggestion) = non_blank(request.suggested_category.as_deref()) {
            return Some(suggestion.to_string());
        }

        let call = self
            .ai
            .suggest_category(&request.description, &request.user_id)
            .await;

        self.cost_meter.dispatch(CostEvent::new(
            request.user_id.clone(),
            CostOperation::SuggestCategory,
            self.ai.provider(),
            self.ai.model(),
            call.usage,
        ));

        match call.result {
            Ok(suggestion) => non_blank(Some(suggestion.as_str())).map(str::to_string),
            Err(err) => {
                debug!(user_id = %request.user_id, error = %err, "category suggestion unavailable");
                None
            }
        }
    }

    /// Request value, then user preference, then the configured default.
    /// Values that are not three-letter codes are skipped.
    async fn resolve_home_currency(&self, request: &CreateExpenseRequest) -> String {
        if let Some(code) = non_blank(request.home_currency.as_deref()) {
            match currency_code(code) {
                Some(code) => return code,
                None => debug!(user_id = %request.user_id, home_currency = %code, "ignoring unrecognised home currency"),
            }
        }
        match self.stores.preferences.home_currency(&request.user_id).await {
            Ok(Some(code)) => currency_code(&code).unwrap_or_else(|| self.default_home_currency.clone()),
            Ok(None) => self.default_home_currency.clone(),
            Err(err) => {
                warn!(user_id = %request.user_id, error = %err, "failed to load home currency preference");
                self.default_home_currency.clone()
            }
        }
    }
}

/// `Recorded <description> <home amount> <home currency>[ (<amount> <currency>)][ [<category>]]`.
fn confirmation_message(expense: &Expense, category: Option<&str>) -> String {
    let mut message = format!(
        "Recorded {} {} {}",
        expense.description,
        expense.home_amount.normalize(),
        expense.home_currency
    );
    if expense.currency != expense.home_currency {
        message.push_str(&format!(
            " ({} {})",
            expense.original_amount.normalize(),
            expense.currency
        ));
    }
    if let Some(category) = category {
        message.push_str(&format!(" [{category}]"));
    }
    message
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The normalized code, or `None` when `code` is not three ASCII letters.
fn currency_code(code: &str) -> Option<String> {
    code.parse::<CurrencyCode>().ok().map(String::from)
}
