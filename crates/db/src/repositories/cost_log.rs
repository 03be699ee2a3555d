//! AI cost log repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tally_core::StoreError;
use tally_core::cost::{AiCostLog, CostLogStore, CostOperation};
use tally_shared::types::{CostLogId, UserId};

use crate::entities::ai_cost_logs;
use crate::error::{store_error, token_count};

/// Cost log backed by the `ai_cost_logs` table.
#[derive(Debug, Clone)]
pub struct CostLogRepository {
    db: DatabaseConnection,
}

impl CostLogRepository {
    /// Creates a new cost log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Cost logs for one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row cannot be decoded.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<AiCostLog>, StoreError> {
        let rows = ai_cost_logs::Entity::find()
            .filter(ai_cost_logs::Column::UserId.eq(user_id.as_str()))
            .order_by_desc(ai_cost_logs::Column::CreatedAt)
            .order_by_desc(ai_cost_logs::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(to_domain).collect()
    }
}

pub(crate) fn to_domain(model: ai_cost_logs::Model) -> Result<AiCostLog, StoreError> {
    let operation = model
        .operation
        .parse::<CostOperation>()
        .map_err(StoreError::Database)?;
    let total_tokens = u64::try_from(model.total_tokens)
        .map_err(|_| StoreError::Database(format!("total_tokens out of range: {}", model.total_tokens)))?;

    Ok(AiCostLog {
        id: CostLogId::from_uuid(model.id),
        user_id: UserId::from(model.user_id),
        operation,
        provider: model.provider,
        model: model.model,
        input_tokens: token_count("input_tokens", model.input_tokens)?,
        output_tokens: token_count("output_tokens", model.output_tokens)?,
        total_tokens,
        cost: model.cost,
        currency: model.currency,
        cost_note: model.cost_note,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn to_active_model(log: &AiCostLog) -> Result<ai_cost_logs::ActiveModel, StoreError> {
    let total_tokens = i64::try_from(log.total_tokens)
        .map_err(|_| StoreError::Database(format!("total_tokens out of range: {}", log.total_tokens)))?;

    Ok(ai_cost_logs::ActiveModel {
        id: Set(log.id.into_inner()),
        user_id: Set(log.user_id.as_str().to_string()),
        operation: Set(log.operation.as_str().to_string()),
        provider: Set(log.provider.clone()),
        model: Set(log.model.clone()),
        input_tokens: Set(i64::from(log.input_tokens)),
        output_tokens: Set(i64::from(log.output_tokens)),
        total_tokens: Set(total_tokens),
        cost: Set(log.cost),
        currency: Set(log.currency.clone()),
        cost_note: Set(log.cost_note.clone()),
        created_at: Set(log.created_at.into()),
    })
}

#[async_trait]
impl CostLogStore for CostLogRepository {
    async fn insert(&self, log: &AiCostLog) -> Result<(), StoreError> {
        to_active_model(log)?
            .insert(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn stored(operation: &str, input_tokens: i64) -> ai_cost_logs::Model {
        ai_cost_logs::Model {
            id: CostLogId::new().into_inner(),
            user_id: "line:U1".to_string(),
            operation: operation.to_string(),
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            input_tokens,
            output_tokens: 50,
            total_tokens: input_tokens + 50,
            cost: dec!(0.0000225),
            currency: "USD".to_string(),
            cost_note: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap().into(),
        }
    }

    #[test]
    fn test_stored_row_decodes() {
        let log = to_domain(stored("suggest_category", 100)).unwrap();

        assert_eq!(log.operation, CostOperation::SuggestCategory);
        assert_eq!(log.input_tokens, 100);
        assert_eq!(log.total_tokens, 150);
        assert_eq!(log.cost, dec!(0.0000225));
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let err = to_domain(stored("summarize", 100)).unwrap_err();
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("summarize")));
    }

    #[test]
    fn test_negative_token_count_is_rejected() {
        assert!(to_domain(stored("parse_expense", -5)).is_err());
    }

    #[test]
    fn test_domain_row_encodes_widened_counts() {
        let log = to_domain(stored("parse_expense", 1_000)).unwrap();
        let active = to_active_model(&log).unwrap();

        assert_eq!(active.input_tokens, Set(1_000));
        assert_eq!(active.total_tokens, Set(1_050));
        assert_eq!(active.operation, Set("parse_expense".to_string()));
    }
}
