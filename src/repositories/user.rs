//! User repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::user::{self, ActiveModel, Entity as User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, StoreError> {
        Ok(User::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn create(
        &self,
        email: &str,
        github_app_integration_id: Option<Uuid>,
    ) -> Result<user::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let user = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            github_app_integration_id: Set(github_app_integration_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(user.insert(&*self.db).await?)
    }

    /// Links the user to the OAuth integration holding their GitHub App token
    pub async fn link_github_app_integration(
        &self,
        user_id: Uuid,
        integration_id: Uuid,
    ) -> Result<user::Model, StoreError> {
        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        let mut active: ActiveModel = user.into();
        active.github_app_integration_id = Set(Some(integration_id));
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&*self.db).await?)
    }
}
