//! Infra entity model
//!
//! This module contains the SeaORM entity model for the infras table. An infra
//! row tracks a single provisioning request from allocation through the
//! asynchronous work performed by the provisioner.

use super::project::Entity as Project;
use chrono::{DateTime, Utc};
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of infrastructure being provisioned
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InfraKind {
    /// Google Container Registry
    #[sea_orm(string_value = "gcr")]
    Gcr,
    /// Google Kubernetes Engine cluster
    #[sea_orm(string_value = "gke")]
    Gke,
}

impl InfraKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfraKind::Gcr => "gcr",
            InfraKind::Gke => "gke",
        }
    }
}

impl std::str::FromStr for InfraKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "gcr" => Ok(InfraKind::Gcr),
            "gke" => Ok(InfraKind::Gke),
            other => Err(format!("unsupported infra kind '{other}'")),
        }
    }
}

/// Lifecycle status of an infra record
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InfraStatus {
    #[sea_orm(string_value = "creating")]
    #[default]
    Creating,
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "updating")]
    Updating,
    #[sea_orm(string_value = "error")]
    Error,
    #[sea_orm(string_value = "deleting")]
    Deleting,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl InfraStatus {
    /// Whether a record in this status may be moved to `next`.
    ///
    /// A failed or deleted record never re-enters `creating`; a new attempt
    /// gets a new record.
    pub fn can_transition_to(&self, next: InfraStatus) -> bool {
        !matches!(
            (self, next),
            (InfraStatus::Error | InfraStatus::Deleted, InfraStatus::Creating)
        )
    }
}

/// Infra entity representing one provisioning request
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "infras")]
pub struct Model {
    /// Assigned by the repository at creation, immutable
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub project_id: Uuid,

    pub kind: InfraKind,

    /// Hex-encoded random suffix used in downstream resource names
    pub suffix: String,

    pub status: InfraStatus,

    /// Cloud integration whose credential owns the provisioned resources
    pub gcp_integration_id: Option<Uuid>,

    pub created_by_user_id: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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

/// Public representation of an infra record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InfraResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub project_id: Uuid,
    pub kind: InfraKind,
    pub suffix: String,
    pub status: InfraStatus,
    #[schema(value_type = Option<String>)]
    pub gcp_integration_id: Option<Uuid>,
    /// RFC3339 creation timestamp
    pub created_at: String,
    /// RFC3339 last update timestamp
    pub updated_at: String,
}

impl From<Model> for InfraResponse {
    fn from(model: Model) -> Self {
        let to_rfc3339 = |dt: DateTimeWithTimeZone| -> String {
            let utc: DateTime<Utc> = dt.with_timezone(&Utc);
            utc.to_rfc3339()
        };

        Self {
            id: model.id,
            project_id: model.project_id,
            kind: model.kind,
            suffix: model.suffix,
            status: model.status,
            gcp_integration_id: model.gcp_integration_id,
            created_at: to_rfc3339(model.created_at),
            updated_at: to_rfc3339(model.updated_at),
        }
    }
}
