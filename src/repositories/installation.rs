//! GitHub App installation repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::github_app_installation::{
    self, ActiveModel, Column, Entity as GithubAppInstallation,
};

#[derive(Debug, Clone)]
pub struct InstallationRepository {
    db: Arc<DatabaseConnection>,
}

impl InstallationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an installation registered for `project_id` by its GitHub installation id
    pub async fn find_for_project(
        &self,
        project_id: Uuid,
        installation_id: i64,
    ) -> Result<Option<github_app_installation::Model>, StoreError> {
        Ok(GithubAppInstallation::find()
            .filter(Column::ProjectId.eq(project_id))
            .filter(Column::InstallationId.eq(installation_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn create(
        &self,
        project_id: Uuid,
        account_id: i64,
        installation_id: i64,
    ) -> Result<github_app_installation::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let installation = ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            account_id: Set(account_id),
            installation_id: Set(installation_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(installation.insert(&*self.db).await?)
    }
}
