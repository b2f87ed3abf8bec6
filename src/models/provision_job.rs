//! Provision job entity model
//!
//! This module contains the SeaORM entity model for the provision_jobs table,
//! the queue through which provisioning work is handed to the runner.

use super::infra::Entity as Infra;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "provision_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Infra record the job operates on
    pub infra_id: Uuid,

    pub project_id: Uuid,

    /// Requested operation (apply, destroy)
    pub operation: String,

    /// Queue status (queued, running, succeeded, failed)
    pub status: String,

    /// Runner instructions: image, pull secret, datastore and credential refs
    #[sea_orm(column_type = "JsonBinary")]
    pub spec: JsonValue,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Infra",
        from = "Column::InfraId",
        to = "super::infra::Column::Id"
    )]
    Infra,
}

impl Related<Infra> for Entity {
    fn to() -> RelationDef {
        Relation::Infra.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
