//! GitHub App OAuth integration entity model
//!
//! This module contains the SeaORM entity model for the
//! github_app_oauth_integrations table, which stores the user-to-server token
//! pair issued by the GitHub App together with its expiry.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Stored OAuth credential for one user's GitHub App authorization
#[derive(Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "github_app_oauth_integrations")]
pub struct Model {
    /// Integration identifier referenced by `users.github_app_integration_id`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// User that authorized the GitHub App
    pub user_id: Uuid,

    /// Opaque access token bytes
    pub access_token: Vec<u8>,

    /// Opaque refresh token bytes (single-use upstream)
    pub refresh_token: Vec<u8>,

    /// Access token expiry; never moves backwards for a given row
    pub expiry: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubAppOauthIntegration")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
