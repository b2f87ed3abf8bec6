//! Infra repository
//!
//! This module provides the Infra Record Store. Records are created with a
//! repository-assigned id; updates only ever touch the status column so the
//! suffix and ownership fields stay as they were allocated.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::infra::{self, ActiveModel, Column, Entity as Infra, InfraKind, InfraStatus};

const ENTITY: &str = "infra";

/// Fields supplied by the caller when allocating an infra record
#[derive(Debug, Clone)]
pub struct NewInfra {
    pub project_id: Uuid,
    pub kind: InfraKind,
    pub suffix: String,
    pub status: InfraStatus,
    pub gcp_integration_id: Option<Uuid>,
    pub created_by_user_id: Uuid,
}

/// Persistence of provisioning records
#[async_trait]
pub trait InfraStore: Send + Sync {
    /// Persists a new record, assigning its id
    async fn create(&self, new: NewInfra) -> Result<infra::Model, StoreError>;

    /// Persists the status carried by `infra`.
    ///
    /// Rejects transitions the stored status does not allow.
    async fn update(&self, infra: &infra::Model) -> Result<infra::Model, StoreError>;

    async fn find(&self, project_id: Uuid, infra_id: Uuid) -> Result<infra::Model, StoreError>;

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<infra::Model>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct InfraRepository {
    db: Arc<DatabaseConnection>,
}

impl InfraRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InfraStore for InfraRepository {
    async fn create(&self, new: NewInfra) -> Result<infra::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let record = ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(new.project_id),
            kind: Set(new.kind),
            suffix: Set(new.suffix),
            status: Set(new.status),
            gcp_integration_id: Set(new.gcp_integration_id),
            created_by_user_id: Set(new.created_by_user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = record.insert(&*self.db).await?;

        tracing::info!(
            infra_id = %created.id,
            project_id = %created.project_id,
            kind = created.kind.as_str(),
            "Infra record created"
        );

        Ok(created)
    }

    async fn update(&self, infra: &infra::Model) -> Result<infra::Model, StoreError> {
        let current = Infra::find_by_id(infra.id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY, infra.id))?;

        if !current.status.can_transition_to(infra.status) {
            return Err(StoreError::conflict(
                ENTITY,
                infra.id,
                format!(
                    "status cannot move from {:?} to {:?}",
                    current.status, infra.status
                ),
            ));
        }

        let mut active: ActiveModel = current.into();
        active.status = Set(infra.status);
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(&*self.db).await?)
    }

    async fn find(&self, project_id: Uuid, infra_id: Uuid) -> Result<infra::Model, StoreError> {
        Infra::find_by_id(infra_id)
            .filter(Column::ProjectId.eq(project_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY, infra_id))
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<infra::Model>, StoreError> {
        Ok(Infra::find()
            .filter(Column::ProjectId.eq(project_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&*self.db)
            .await?)
    }
}
