//! Expense errors.

use thiserror::Error;

use crate::error::StoreError;

/// Expense creation errors.
///
/// Only failing to persist the expense itself is an error; everything else
/// degrades (uncategorized, unconverted) and is logged.
#[derive(Debug, Clone, Error)]
pub enum ExpenseError {
    /// The expense row could not be written.
    #[error("Failed to persist expense: {0}")]
    Persistence(#[from] StoreError),
}

impl From<ExpenseError> for tally_shared::AppError {
    fn from(err: ExpenseError) -> Self {
        match err {
            ExpenseError::Persistence(e) => e.into(),
        }
    }
}
