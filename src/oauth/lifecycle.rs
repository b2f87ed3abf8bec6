use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::repositories::CredentialStore;

use super::{BearerToken, OAuthCredential, TokenError, TokenPair, TokenRefresher};

/// Resolves the calling user's GitHub App token for the current request.
///
/// No locks are taken. When two requests race on an expired token, the one
/// whose refresh fails re-reads the store once and adopts the token the other
/// request persisted, identified by a changed expiry.
#[derive(Clone)]
pub struct TokenLifecycle {
    store: Arc<dyn CredentialStore>,
    refresher: TokenRefresher,
}

impl TokenLifecycle {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: TokenRefresher) -> Self {
        Self { store, refresher }
    }

    #[instrument(skip_all, fields(user_id = %ctx.user.id))]
    pub async fn resolve_token(&self, ctx: &RequestContext) -> Result<BearerToken, TokenError> {
        let integration_id = ctx
            .user
            .github_app_integration_id
            .ok_or(TokenError::NotLinked {
                user_id: ctx.user.id,
            })?;

        self.resolve_for_integration(integration_id).await
    }

    pub async fn resolve_for_integration(
        &self,
        integration_id: Uuid,
    ) -> Result<BearerToken, TokenError> {
        let original = self.store.read(integration_id).await?;

        let pair = match self
            .refresher
            .access_token(&original, self.store.as_ref())
            .await
        {
            Ok(pair) => pair,
            Err(refresh_err) => self.adopt_concurrent_refresh(&original, refresh_err).await?,
        };

        BearerToken::from_pair(integration_id, pair)
    }

    /// Re-reads the credential once after a failed refresh. A changed expiry
    /// means another request rotated the token; otherwise `refresh_err` stands.
    async fn adopt_concurrent_refresh(
        &self,
        original: &OAuthCredential,
        refresh_err: TokenError,
    ) -> Result<TokenPair, TokenError> {
        let integration_id = original.integration_id;
        match self.store.read(integration_id).await {
            Ok(current) if current.expiry != original.expiry => {
                counter!("oauth_token_adopted_total").increment(1);
                info!(
                    integration_id = %integration_id,
                    error = %refresh_err,
                    "Refresh failed but a concurrent refresh stored a new token; adopting it"
                );
                Ok(current.token_pair())
            }
            Ok(_) => {
                warn!(integration_id = %integration_id, error = %refresh_err, "Token refresh failed");
                Err(refresh_err)
            }
            Err(reread_err) => {
                warn!(
                    integration_id = %integration_id,
                    error = %refresh_err,
                    reread_error = %reread_err,
                    "Token refresh failed and credential re-read failed"
                );
                Err(refresh_err)
            }
        }
    }
}
