//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository implementations of the `tally-core` storage traits
//! - Database migrations

pub mod entities;
mod error;
pub mod migration;
pub mod repositories;

pub use repositories::{
    CategoryRepository, CostLogRepository, ExchangeRateRepository, ExpenseRepository,
    PricingRepository, UserPreferenceRepository,
};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
