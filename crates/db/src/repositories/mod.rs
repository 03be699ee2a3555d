//! Repository implementations of the core storage traits.

pub mod category;
pub mod cost_log;
pub mod exchange_rate;
pub mod expense;
pub mod pricing;
pub mod user_preference;

pub use category::CategoryRepository;
pub use cost_log::CostLogRepository;
pub use exchange_rate::ExchangeRateRepository;
pub use expense::ExpenseRepository;
pub use pricing::PricingRepository;
pub use user_preference::UserPreferenceRepository;
