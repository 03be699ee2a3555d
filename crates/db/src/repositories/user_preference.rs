//! User preference repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tally_core::StoreError;
use tally_core::expense::UserPreferenceStore;
use tally_shared::types::UserId;

use crate::entities::user_preferences;
use crate::error::store_error;

/// Per-user settings backed by the `user_preferences` table.
#[derive(Debug, Clone)]
pub struct UserPreferenceRepository {
    db: DatabaseConnection,
}

impl UserPreferenceRepository {
    /// Creates a new preference repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sets or clears the user's home currency, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn set_home_currency(
        &self,
        user_id: &UserId,
        home_currency: Option<&str>,
    ) -> Result<(), StoreError> {
        let row = user_preferences::ActiveModel {
            user_id: Set(user_id.as_str().to_string()),
            home_currency: Set(home_currency.map(|c| c.trim().to_ascii_uppercase())),
            updated_at: Set(Utc::now().into()),
        };

        user_preferences::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user_preferences::Column::UserId)
                    .update_columns([
                        user_preferences::Column::HomeCurrency,
                        user_preferences::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl UserPreferenceStore for UserPreferenceRepository {
    async fn home_currency(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        let model = user_preferences::Entity::find_by_id(user_id.as_str().to_string())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model
            .and_then(|m| m.home_currency)
            .filter(|c| !c.trim().is_empty()))
    }
}
