use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::config::TokenRefreshConfig;
use crate::repositories::CredentialStore;

use super::{ExchangeError, OAuthCredential, TokenError, TokenExchanger, TokenPair};

/// Refreshes expired credentials and persists the result through an update hook
#[derive(Clone)]
pub struct TokenRefresher {
    exchanger: Arc<dyn TokenExchanger>,
    leeway: Duration,
    fallback_ttl: Duration,
}

impl TokenRefresher {
    pub fn new(exchanger: Arc<dyn TokenExchanger>, leeway: Duration, fallback_ttl: Duration) -> Self {
        Self {
            exchanger,
            leeway,
            fallback_ttl,
        }
    }

    pub fn from_config(exchanger: Arc<dyn TokenExchanger>, config: &TokenRefreshConfig) -> Self {
        Self::new(
            exchanger,
            Duration::seconds(config.expiry_leeway_seconds as i64),
            Duration::seconds(config.fallback_ttl_seconds as i64),
        )
    }

    /// Returns a usable token pair for `credential`.
    ///
    /// A credential that is still valid is returned as stored. An expired one is
    /// exchanged upstream once and, when the access token changed, written
    /// through `update` before the new pair is returned.
    pub async fn access_token(
        &self,
        credential: &OAuthCredential,
        update: &dyn CredentialStore,
    ) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        if !credential.is_expired(now, self.leeway) {
            debug!(integration_id = %credential.integration_id, "Stored token still valid");
            return Ok(credential.token_pair());
        }

        let integration_id = credential.integration_id;
        if credential.refresh_token.is_empty() {
            return Err(TokenError::MissingRefreshToken { integration_id });
        }
        let refresh_token = std::str::from_utf8(&credential.refresh_token)
            .map_err(|_| TokenError::MalformedToken { integration_id })?;

        counter!("oauth_token_refresh_attempts_total").increment(1);
        let exchanged = self
            .exchanger
            .exchange_refresh_token(refresh_token)
            .await
            .inspect_err(|e| {
                counter!("oauth_token_refresh_failures_total").increment(1);
                warn!(integration_id = %integration_id, error = %e, "Token refresh exchange failed");
            })?;

        if exchanged.access_token.is_empty() {
            return Err(ExchangeError::Rejected("empty access token in response".into()).into());
        }

        // An expiry chrono cannot represent falls back to the configured TTL
        let expiry = exchanged
            .expires_in
            .and_then(|d| Duration::from_std(d).ok())
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .or_else(|| now.checked_add_signed(self.fallback_ttl))
            .ok_or_else(|| ExchangeError::Rejected("token lifetime out of range".into()))?;

        let refreshed = OAuthCredential {
            integration_id,
            access_token: exchanged.access_token.into_bytes(),
            refresh_token: exchanged
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(String::into_bytes)
                .unwrap_or_else(|| credential.refresh_token.clone()),
            expiry,
        };

        if refreshed.access_token != credential.access_token {
            update.write(&refreshed).await?;
            info!(
                integration_id = %integration_id,
                expiry = %refreshed.expiry,
                "Refreshed and stored access token"
            );
        }

        Ok(refreshed.token_pair())
    }
}
