//! Exchange rate cache repository.
//!
//! Rows are append-only. Lookups prefer the newest insert when several rows
//! share a pair and date.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select, Set,
};
use tally_core::StoreError;
use tally_core::currency::{ExchangeRate, ExchangeRateStore};
use tally_shared::types::ExchangeRateId;

use crate::entities::exchange_rates;
use crate::error::store_error;

/// Exchange rate repository backed by the `exchange_rates` table.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: exchange_rates::Model) -> ExchangeRate {
    ExchangeRate::new(
        &model.base_currency,
        &model.target_currency,
        model.rate,
        model.rate_date,
    )
}

fn pair_filter(base: &str, target: &str) -> Select<exchange_rates::Entity> {
    exchange_rates::Entity::find()
        .filter(exchange_rates::Column::BaseCurrency.eq(base.trim().to_ascii_uppercase()))
        .filter(exchange_rates::Column::TargetCurrency.eq(target.trim().to_ascii_uppercase()))
}

#[async_trait]
impl ExchangeRateStore for ExchangeRateRepository {
    async fn find_exact(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        let model = pair_filter(base, target)
            .filter(exchange_rates::Column::RateDate.eq(date))
            .order_by_desc(exchange_rates::Column::CreatedAt)
            .order_by_desc(exchange_rates::Column::Id)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_domain))
    }

    async fn find_latest_on_or_before(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        let model = pair_filter(base, target)
            .filter(exchange_rates::Column::RateDate.lte(date))
            .order_by_desc(exchange_rates::Column::RateDate)
            .order_by_desc(exchange_rates::Column::CreatedAt)
            .order_by_desc(exchange_rates::Column::Id)
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_domain))
    }

    async fn insert(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        exchange_rates::ActiveModel {
            id: Set(ExchangeRateId::new().into_inner()),
            base_currency: Set(rate.base_currency.clone()),
            target_currency: Set(rate.target_currency.clone()),
            rate: Set(rate.rate),
            rate_date: Set(rate.rate_date),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}
