//! Migration to create the github_app_installations table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GithubAppInstallations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GithubAppInstallations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GithubAppInstallations::ProjectId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppInstallations::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppInstallations::InstallationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppInstallations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GithubAppInstallations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_github_app_installations_project_id")
                            .from(GithubAppInstallations::Table, GithubAppInstallations::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_github_app_installations_project_installation")
                    .table(GithubAppInstallations::Table)
                    .col(GithubAppInstallations::ProjectId)
                    .col(GithubAppInstallations::InstallationId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_github_app_installations_project_installation")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(GithubAppInstallations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum GithubAppInstallations {
    Table,
    Id,
    ProjectId,
    AccountId,
    InstallationId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
