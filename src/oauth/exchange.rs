//! Upstream refresh-token grant.

use std::time::Duration;

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};
use thiserror::Error;

use crate::config::{GithubAppConfig, TokenRefreshConfig};

use super::TokenError;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("authorization server rejected the refresh token: {0}")]
    Rejected(String),
    #[error("token endpoint request failed: {0}")]
    Transport(String),
}

/// Result of a successful refresh-token grant
#[derive(Clone)]
pub struct ExchangedToken {
    pub access_token: String,
    /// `None` when the server did not rotate the refresh token
    pub refresh_token: Option<String>,
    /// `None` when the server omitted `expires_in`
    pub expires_in: Option<Duration>,
}

impl std::fmt::Debug for ExchangedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangedToken")
            .field("access_token", &"[REDACTED]")
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Performs the OAuth2 refresh-token grant against an authorization server
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<ExchangedToken, ExchangeError>;
}

/// [`TokenExchanger`] backed by the `oauth2` crate
pub struct OAuth2Exchanger {
    client_id: String,
    client_secret: String,
    token_url: TokenUrl,
    http_client: reqwest::Client,
}

impl OAuth2Exchanger {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TokenError> {
        let token_url = TokenUrl::new(token_url.into())
            .map_err(|e| TokenError::Configuration(format!("invalid token URL: {e}")))?;

        // Following redirects from the token endpoint would forward the client secret
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url,
            http_client,
        })
    }

    pub fn from_config(
        github_app: &GithubAppConfig,
        token_refresh: &TokenRefreshConfig,
    ) -> Result<Self, TokenError> {
        let client_id = github_app
            .client_id
            .clone()
            .ok_or_else(|| TokenError::Configuration("github_app.client_id is not set".into()))?;
        let client_secret = github_app.client_secret.clone().ok_or_else(|| {
            TokenError::Configuration("github_app.client_secret is not set".into())
        })?;

        Self::new(
            client_id,
            client_secret,
            github_app.token_url(),
            Duration::from_secs(token_refresh.http_timeout_seconds),
        )
    }
}

#[async_trait]
impl TokenExchanger for OAuth2Exchanger {
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<ExchangedToken, ExchangeError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(self.token_url.clone());

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(response) => {
                    ExchangeError::Rejected(response.to_string())
                }
                // GitHub reports refresh failures as 200 responses without an access token
                RequestTokenError::Parse(e, _) => {
                    ExchangeError::Rejected(format!("unexpected token response: {e}"))
                }
                other => ExchangeError::Transport(other.to_string()),
            })?;

        Ok(ExchangedToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in(),
        })
    }
}

/// Stands in when no OAuth client is configured (local profiles only)
pub struct UnconfiguredExchanger;

#[async_trait]
impl TokenExchanger for UnconfiguredExchanger {
    async fn exchange_refresh_token(&self, _: &str) -> Result<ExchangedToken, ExchangeError> {
        Err(ExchangeError::Transport(
            "GitHub OAuth client is not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_token_url() {
        let result = OAuth2Exchanger::new("id", "secret", "not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(TokenError::Configuration(_))));
    }

    #[test]
    fn exchanged_token_debug_is_redacted() {
        let token = ExchangedToken {
            access_token: "ghu_secret".into(),
            refresh_token: Some("ghr_secret".into()),
            expires_in: None,
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("ghu_secret"));
        assert!(!debug.contains("ghr_secret"));
    }
}
