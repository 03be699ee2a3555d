//! Storage seams used by the expense assembler.

use async_trait::async_trait;
use tally_shared::types::{CategoryId, ExpenseId, UserId};

use super::types::{Category, Expense};
use crate::error::StoreError;

/// Expense persistence.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts an expense and returns it as stored.
    async fn insert(&self, expense: &Expense) -> Result<Expense, StoreError>;

    /// Loads an expense by id.
    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError>;
}

/// Category lookup.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Category>, StoreError>;

    /// One category by id.
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Inserts a category.
    async fn insert(&self, category: &Category) -> Result<Category, StoreError>;
}

/// Per-user settings.
#[async_trait]
pub trait UserPreferenceStore: Send + Sync {
    /// The user's preferred home currency, if set.
    async fn home_currency(&self, user_id: &UserId) -> Result<Option<String>, StoreError>;
}
