//! Migration to create the github_app_oauth_integrations table.
//!
//! Each row holds the user-to-server OAuth token pair issued by the GitHub App.
//! The expiry column only ever moves forward; writes are conditional on it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GithubAppOauthIntegrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::AccessToken)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::RefreshToken)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::Expiry)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GithubAppOauthIntegrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_github_app_oauth_integrations_user_id")
                            .from(
                                GithubAppOauthIntegrations::Table,
                                GithubAppOauthIntegrations::UserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(GithubAppOauthIntegrations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum GithubAppOauthIntegrations {
    Table,
    Id,
    UserId,
    AccessToken,
    RefreshToken,
    Expiry,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
