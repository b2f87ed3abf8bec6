//! GCP integration entity model
//!
//! This module contains the SeaORM entity model for the gcp_integrations table,
//! which holds project-scoped service account credentials used by the provisioner.

use super::project::Entity as Project;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gcp_integrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Project the credential is scoped to
    pub project_id: Uuid,

    /// User that registered the credential
    pub user_id: Uuid,

    /// Google Cloud project identifier
    pub gcp_project_id: String,

    /// Service account email
    pub gcp_sa_email: String,

    pub gcp_region: Option<String>,

    /// Service account key JSON
    pub key_data: Vec<u8>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpIntegration")
            .field("id", &self.id)
            .field("project_id", &self.project_id)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("gcp_sa_email", &self.gcp_sa_email)
            .field("gcp_region", &self.gcp_region)
            .field("key_data", &"[REDACTED]")
            .finish()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Project",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<Project> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
