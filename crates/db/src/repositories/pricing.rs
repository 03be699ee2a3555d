//! Versioned AI pricing repository.
//!
//! A price change never edits a row. The active row is switched off and a
//! new one inserted, inside one transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::StoreError;
use tally_core::pricing::{PricingConfig, PricingConfigInput, PricingLedger, SupersedeError};
use tally_shared::types::PricingConfigId;
use tracing::debug;

use crate::entities::pricing_configs;
use crate::error::store_error;

/// Pricing ledger backed by the `pricing_configs` table.
#[derive(Debug, Clone)]
pub struct PricingRepository {
    db: DatabaseConnection,
}

impl PricingRepository {
    /// Creates a new pricing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Full price history for one model, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn history(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Vec<PricingConfig>, StoreError> {
        let rows = pricing_configs::Entity::find()
            .filter(pricing_configs::Column::Provider.eq(provider))
            .filter(pricing_configs::Column::Model.eq(model))
            .order_by_desc(pricing_configs::Column::CreatedAt)
            .order_by_desc(pricing_configs::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(to_domain).collect())
    }
}

pub(crate) fn to_domain(model: pricing_configs::Model) -> PricingConfig {
    PricingConfig {
        id: PricingConfigId::from_uuid(model.id),
        provider: model.provider,
        model: model.model,
        input_token_price: model.input_token_price,
        output_token_price: model.output_token_price,
        currency: model.currency,
        effective_date: model.effective_date.with_timezone(&Utc),
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn to_active_model(row: &PricingConfig) -> pricing_configs::ActiveModel {
    pricing_configs::ActiveModel {
        id: Set(row.id.into_inner()),
        provider: Set(row.provider.clone()),
        model: Set(row.model.clone()),
        input_token_price: Set(row.input_token_price),
        output_token_price: Set(row.output_token_price),
        currency: Set(row.currency.clone()),
        effective_date: Set(row.effective_date.into()),
        is_active: Set(row.is_active),
        created_at: Set(row.created_at.into()),
        updated_at: Set(row.updated_at.into()),
    }
}

async fn deactivate_on<C: ConnectionTrait>(conn: &C, id: PricingConfigId) -> Result<(), StoreError> {
    let result = pricing_configs::Entity::update_many()
        .col_expr(pricing_configs::Column::IsActive, Expr::value(false))
        .col_expr(pricing_configs::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(pricing_configs::Column::Id.eq(id.into_inner()))
        .filter(pricing_configs::Column::IsActive.eq(true))
        .exec(conn)
        .await
        .map_err(store_error)?;

    if result.rows_affected == 0 {
        return Err(StoreError::Conflict(format!("pricing {id} is not active")));
    }
    Ok(())
}

async fn create_on<C: ConnectionTrait>(
    conn: &C,
    input: &PricingConfigInput,
) -> Result<PricingConfig, StoreError> {
    let row = input.clone().into_active(Utc::now());
    let model = to_active_model(&row).insert(conn).await.map_err(store_error)?;
    Ok(to_domain(model))
}

#[async_trait]
impl PricingLedger for PricingRepository {
    async fn find_active(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Option<PricingConfig>, StoreError> {
        let row = pricing_configs::Entity::find()
            .filter(pricing_configs::Column::Provider.eq(provider))
            .filter(pricing_configs::Column::Model.eq(model))
            .filter(pricing_configs::Column::IsActive.eq(true))
            .order_by_desc(pricing_configs::Column::CreatedAt)
            .order_by_desc(pricing_configs::Column::Id)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(row.map(to_domain))
    }

    async fn deactivate(&self, id: PricingConfigId) -> Result<(), StoreError> {
        deactivate_on(&self.db, id).await
    }

    async fn create(&self, input: &PricingConfigInput) -> Result<PricingConfig, StoreError> {
        create_on(&self.db, input).await
    }

    async fn supersede(
        &self,
        current: &PricingConfig,
        replacement: &PricingConfigInput,
    ) -> Result<PricingConfig, SupersedeError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| SupersedeError::Deactivate(store_error(e)))?;

        deactivate_on(&txn, current.id)
            .await
            .map_err(SupersedeError::Deactivate)?;
        let created = create_on(&txn, replacement)
            .await
            .map_err(SupersedeError::Create)?;

        txn.commit()
            .await
            .map_err(|e| SupersedeError::Create(store_error(e)))?;

        debug!(previous_id = %current.id, new_id = %created.id, "pricing row superseded");
        Ok(created)
    }
}
