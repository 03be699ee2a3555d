//! Expense assembly: category, currency normalization and persistence.

pub mod category;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use category::{CategoryResolver, ExactNameResolver};
pub use error::ExpenseError;
pub use service::{ExpenseAssembler, ExpenseStores};
pub use store::{CategoryStore, ExpenseStore, UserPreferenceStore};
pub use types::{Category, CreateExpenseRequest, Expense, ExpenseSummary};
