//! Migration to create the provision_jobs table.
//!
//! Jobs are the dispatch queue between the API and the out-of-process
//! provisioner runner. Each job references the infra row it operates on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProvisionJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProvisionJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProvisionJobs::InfraId).uuid().not_null())
                    .col(ColumnDef::new(ProvisionJobs::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProvisionJobs::Operation).text().not_null())
                    .col(
                        ColumnDef::new(ProvisionJobs::Status)
                            .text()
                            .not_null()
                            .default("queued"),
                    )
                    .col(ColumnDef::new(ProvisionJobs::Spec).json_binary().not_null())
                    .col(
                        ColumnDef::new(ProvisionJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProvisionJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provision_jobs_infra_id")
                            .from(ProvisionJobs::Table, ProvisionJobs::InfraId)
                            .to(Infras::Table, Infras::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_provision_jobs_status_created_at")
                    .table(ProvisionJobs::Table)
                    .col(ProvisionJobs::Status)
                    .col(ProvisionJobs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_provision_jobs_status_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProvisionJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProvisionJobs {
    Table,
    Id,
    InfraId,
    ProjectId,
    Operation,
    Status,
    Spec,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Infras {
    Table,
    Id,
}
