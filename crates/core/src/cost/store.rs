//! Storage seam for cost logs.

use async_trait::async_trait;

use super::types::AiCostLog;
use crate::error::StoreError;

/// Append-only AI cost log.
#[async_trait]
pub trait CostLogStore: Send + Sync {
    /// Inserts one log row.
    async fn insert(&self, log: &AiCostLog) -> Result<(), StoreError>;
}
