//! GCP integration repository
//!
//! Project-scoped lookups of cloud credentials. A credential that exists in a
//! different project is reported exactly like a missing one.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::gcp_integration::{self, ActiveModel, Column, Entity as GcpIntegration};

const ENTITY: &str = "gcp_integration";

/// Read access to project-scoped cloud credentials
#[async_trait]
pub trait CloudIntegrationStore: Send + Sync {
    async fn read_gcp(
        &self,
        project_id: Uuid,
        integration_id: Uuid,
    ) -> Result<gcp_integration::Model, StoreError>;
}

/// Fields required to register a GCP credential
#[derive(Debug, Clone)]
pub struct NewGcpIntegration {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub gcp_project_id: String,
    pub gcp_sa_email: String,
    pub gcp_region: Option<String>,
    pub key_data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GcpIntegrationRepository {
    db: Arc<DatabaseConnection>,
}

impl GcpIntegrationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        new: NewGcpIntegration,
    ) -> Result<gcp_integration::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let integration = ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(new.project_id),
            user_id: Set(new.user_id),
            gcp_project_id: Set(new.gcp_project_id),
            gcp_sa_email: Set(new.gcp_sa_email),
            gcp_region: Set(new.gcp_region),
            key_data: Set(new.key_data),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(integration.insert(&*self.db).await?)
    }
}

#[async_trait]
impl CloudIntegrationStore for GcpIntegrationRepository {
    async fn read_gcp(
        &self,
        project_id: Uuid,
        integration_id: Uuid,
    ) -> Result<gcp_integration::Model, StoreError> {
        GcpIntegration::find_by_id(integration_id)
            .filter(Column::ProjectId.eq(project_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(ENTITY, integration_id))
    }
}
