//! `SeaORM` entity definitions.

pub mod ai_cost_logs;
pub mod categories;
pub mod exchange_rates;
pub mod expenses;
pub mod pricing_configs;
pub mod user_preferences;
