//! # Provision Job Repository
//!
//! Queue operations for the provision_jobs table. The API only enqueues; the
//! runner claims and completes jobs out of process.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::provision_job::{ActiveModel, Column, Entity, Model};

pub struct ProvisionJobRepository {
    db: Arc<DatabaseConnection>,
}

impl ProvisionJobRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Enqueue a job for the runner
    pub async fn enqueue(
        &self,
        infra_id: Uuid,
        project_id: Uuid,
        operation: &str,
        spec: JsonValue,
    ) -> Result<Model, StoreError> {
        let now = Utc::now().fixed_offset();

        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            infra_id: Set(infra_id),
            project_id: Set(project_id),
            operation: Set(operation.to_string()),
            status: Set("queued".to_string()),
            spec: Set(spec),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let job = job.insert(&*self.db).await?;

        tracing::info!(
            job_id = %job.id,
            infra_id = %infra_id,
            project_id = %project_id,
            operation = %operation,
            "Provision job enqueued"
        );

        Ok(job)
    }

    /// Lists jobs for an infra record, oldest first
    pub async fn list_for_infra(&self, infra_id: Uuid) -> Result<Vec<Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::InfraId.eq(infra_id))
            .order_by_asc(Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
