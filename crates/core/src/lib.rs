//! Core business logic for Tally.
//!
//! This crate contains the expense-ingestion pipeline with ZERO web or database
//! dependencies. Storage and external providers are reached through traits that
//! the `tally-db` and `tally-providers` crates implement.
//!
//! # Modules
//!
//! - `parsing` - Free text to expense candidates, relative date resolution
//! - `currency` - Exchange rate cache-then-fetch chain and conversion
//! - `expense` - Assembling candidates into persisted expenses
//! - `pricing` - Versioned AI price ledger and its sync job
//! - `cost` - AI usage cost metering on a detached worker
//! - `ai` - AI backend seam shared by parsing and categorization

pub mod ai;
pub mod cost;
pub mod currency;
pub mod error;
pub mod expense;
pub mod parsing;
pub mod pricing;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ProviderError, StoreError};
