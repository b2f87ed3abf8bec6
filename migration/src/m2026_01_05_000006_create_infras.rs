//! Migration to create the infras table.
//!
//! An infra row tracks one provisioning request (registry or cluster) through
//! its lifecycle. The suffix column is written once at creation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Infras::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Infras::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Infras::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Infras::Kind).text().not_null())
                    .col(ColumnDef::new(Infras::Suffix).text().not_null())
                    .col(
                        ColumnDef::new(Infras::Status)
                            .text()
                            .not_null()
                            .default("creating"),
                    )
                    .col(ColumnDef::new(Infras::GcpIntegrationId).uuid().null())
                    .col(ColumnDef::new(Infras::CreatedByUserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Infras::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Infras::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_infras_project_id")
                            .from(Infras::Table, Infras::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_infras_project_id")
                    .table(Infras::Table)
                    .col(Infras::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_infras_project_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Infras::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Infras {
    Table,
    Id,
    ProjectId,
    Kind,
    Suffix,
    Status,
    GcpIntegrationId,
    CreatedByUserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
