//! GitHub App OAuth integration repository
//!
//! Credential Store for the token lifecycle. Reads are plain lookups; writes are
//! conditional on the stored expiry so that a slower writer can never replace a
//! newer token pair with an older one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;
use crate::models::github_app_oauth_integration::{
    self, ActiveModel, Column, Entity as GithubAppOauthIntegration,
};
use crate::oauth::OAuthCredential;

const ENTITY: &str = "github_app_oauth_integration";

/// Read and conditional update of stored OAuth credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the current credential for an integration
    async fn read(&self, integration_id: Uuid) -> Result<OAuthCredential, StoreError>;

    /// Persists a refreshed credential.
    ///
    /// Fails with [`StoreError::Conflict`] when the stored expiry is already
    /// later than the one being written.
    async fn write(&self, credential: &OAuthCredential) -> Result<(), StoreError>;
}

/// SeaORM-backed credential store
#[derive(Debug, Clone)]
pub struct OAuthIntegrationRepository {
    db: Arc<DatabaseConnection>,
}

impl OAuthIntegrationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stores the token pair issued when a user first authorizes the GitHub App
    pub async fn create(
        &self,
        user_id: Uuid,
        access_token: &[u8],
        refresh_token: &[u8],
        expiry: DateTime<Utc>,
    ) -> Result<github_app_oauth_integration::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let integration = ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            access_token: Set(access_token.to_vec()),
            refresh_token: Set(refresh_token.to_vec()),
            expiry: Set(expiry.fixed_offset()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(integration.insert(&*self.db).await?)
    }
}

impl From<github_app_oauth_integration::Model> for OAuthCredential {
    fn from(model: github_app_oauth_integration::Model) -> Self {
        Self {
            integration_id: model.id,
            access_token: model.access_token,
            refresh_token: model.refresh_token,
            expiry: model.expiry.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl CredentialStore for OAuthIntegrationRepository {
    async fn read(&self, integration_id: Uuid) -> Result<OAuthCredential, StoreError> {
        GithubAppOauthIntegration::find_by_id(integration_id)
            .one(&*self.db)
            .await?
            .map(OAuthCredential::from)
            .ok_or_else(|| StoreError::not_found(ENTITY, integration_id))
    }

    async fn write(&self, credential: &OAuthCredential) -> Result<(), StoreError> {
        let expiry = credential.expiry.fixed_offset();

        let result = GithubAppOauthIntegration::update_many()
            .col_expr(
                Column::AccessToken,
                Expr::value(credential.access_token.clone()),
            )
            .col_expr(
                Column::RefreshToken,
                Expr::value(credential.refresh_token.clone()),
            )
            .col_expr(Column::Expiry, Expr::value(expiry))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Id.eq(credential.integration_id))
            .filter(Column::Expiry.lte(expiry))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::debug!(
                integration_id = %credential.integration_id,
                expiry = %credential.expiry,
                "Persisted refreshed OAuth credential"
            );
            return Ok(());
        }

        // Nothing matched: either the row is gone or a newer expiry is stored.
        match GithubAppOauthIntegration::find_by_id(credential.integration_id)
            .one(&*self.db)
            .await?
        {
            Some(current) => Err(StoreError::conflict(
                ENTITY,
                credential.integration_id,
                format!(
                    "stored expiry {} is newer than {}",
                    current.expiry.with_timezone(&Utc),
                    credential.expiry
                ),
            )),
            None => Err(StoreError::not_found(ENTITY, credential.integration_id)),
        }
    }
}
