//! Expense repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tally_core::StoreError;
use tally_core::expense::{Expense, ExpenseStore};
use tally_shared::types::{CategoryId, ExpenseId, UserId};

use crate::entities::expenses;
use crate::error::store_error;

/// Expense repository backed by the `expenses` table.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn to_domain(model: expenses::Model) -> Expense {
    Expense {
        id: ExpenseId::from_uuid(model.id),
        user_id: UserId::from(model.user_id),
        description: model.description,
        original_amount: model.original_amount,
        currency: model.currency,
        home_amount: model.home_amount,
        home_currency: model.home_currency,
        exchange_rate: model.exchange_rate,
        category_id: model.category_id.map(CategoryId::from_uuid),
        account: model.account,
        expense_date: model.expense_date.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn to_active_model(expense: &Expense) -> expenses::ActiveModel {
    expenses::ActiveModel {
        id: Set(expense.id.into_inner()),
        user_id: Set(expense.user_id.as_str().to_string()),
        description: Set(expense.description.clone()),
        original_amount: Set(expense.original_amount),
        currency: Set(expense.currency.clone()),
        home_amount: Set(expense.home_amount),
        home_currency: Set(expense.home_currency.clone()),
        exchange_rate: Set(expense.exchange_rate),
        category_id: Set(expense.category_id.map(CategoryId::into_inner)),
        account: Set(expense.account.clone()),
        expense_date: Set(expense.expense_date.into()),
        created_at: Set(expense.created_at.into()),
        updated_at: Set(expense.updated_at.into()),
    }
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert(&self, expense: &Expense) -> Result<Expense, StoreError> {
        let model = to_active_model(expense)
            .insert(&self.db)
            .await
            .map_err(store_error)?;
        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        let model = expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_domain))
    }
}
