//! AI usage cost metering.
//!
//! Every AI call reports token usage; the [`CostMeter`] prices it against the
//! active pricing row and appends an [`AiCostLog`]. Metering runs on a detached
//! worker so it never delays or fails the operation that made the call.

pub mod meter;
pub mod store;
pub mod types;
pub mod worker;

pub use meter::{CostMeter, FALLBACK_COST_CURRENCY, compute_cost};
pub use store::CostLogStore;
pub use types::{AiCostLog, CostEvent, CostOperation};
pub use worker::{CostMeterHandle, CostMeterWorker};
