//! Versioned AI pricing ledger and its synchronization job.

pub mod ledger;
pub mod sync;
pub mod types;

pub use ledger::{PricingLedger, PricingProvider, StaticPricingProvider, SupersedeError};
pub use sync::{PricingSync, PricingSyncReport, price_changed};
pub use types::{PricingConfig, PricingConfigInput};
