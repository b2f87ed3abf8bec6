//! Migration to create the gcp_integrations table.
//!
//! GCP integrations are project-scoped service account credentials that the
//! provisioner uses to create registries and clusters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GcpIntegrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GcpIntegrations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GcpIntegrations::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(GcpIntegrations::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(GcpIntegrations::GcpProjectId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GcpIntegrations::GcpSaEmail).text().not_null())
                    .col(ColumnDef::new(GcpIntegrations::GcpRegion).text().null())
                    .col(ColumnDef::new(GcpIntegrations::KeyData).binary().not_null())
                    .col(
                        ColumnDef::new(GcpIntegrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GcpIntegrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_gcp_integrations_project_id")
                            .from(GcpIntegrations::Table, GcpIntegrations::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gcp_integrations_project_id")
                    .table(GcpIntegrations::Table)
                    .col(GcpIntegrations::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_gcp_integrations_project_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(GcpIntegrations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GcpIntegrations {
    Table,
    Id,
    ProjectId,
    UserId,
    GcpProjectId,
    GcpSaEmail,
    GcpRegion,
    KeyData,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
