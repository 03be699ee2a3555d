//! Category repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tally_core::StoreError;
use tally_core::expense::{Category, CategoryStore};
use tally_shared::types::{CategoryId, UserId};

use crate::entities::categories;
use crate::error::store_error;

/// Category repository backed by the `categories` table.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: categories::Model) -> Category {
    Category {
        id: CategoryId::from_uuid(model.id),
        user_id: UserId::from(model.user_id),
        name: model.name,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl CategoryStore for CategoryRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Category>, StoreError> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id.as_str()))
            .order_by_asc(categories::Column::CreatedAt)
            .order_by_asc(categories::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let model = categories::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_domain))
    }

    async fn insert(&self, category: &Category) -> Result<Category, StoreError> {
        let model = categories::ActiveModel {
            id: Set(category.id.into_inner()),
            user_id: Set(category.user_id.as_str().to_string()),
            name: Set(category.name.clone()),
            created_at: Set(category.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(store_error)?;
        Ok(to_domain(model))
    }
}
