//! Project repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::project::{self, ActiveModel, Entity as Project};

#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: Arc<DatabaseConnection>,
}

impl ProjectRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<project::Model>, StoreError> {
        Ok(Project::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn create(
        &self,
        name: &str,
        owner_user_id: Uuid,
    ) -> Result<project::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let project = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            owner_user_id: Set(owner_user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(project.insert(&*self.db).await?)
    }
}
