//! GitHub App authentication.
//!
//! The App signs a short-lived RS256 JWT with its private key and exchanges it
//! for an installation access token, which authorizes calls scoped to that
//! installation.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::{Branch, RepositoryPage};
use super::{GithubError, PER_PAGE, Repository, http_client, read_json};
use crate::config::GithubAppConfig;

/// Backdating of `iat` to absorb clock drift against GitHub
const JWT_BACKDATE_SECS: i64 = 60;
/// GitHub rejects App JWTs valid for longer than ten minutes
const JWT_LIFETIME_SECS: i64 = 9 * 60;
/// Installation tokens are renewed this long before they expire
const TOKEN_RENEW_MARGIN_SECS: i64 = 60;

/// Claims of a GitHub App JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct InstallationToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Client acting as the App for a single installation
pub struct GithubAppClient {
    app_id: u64,
    installation_id: i64,
    api_base: String,
    signing_key: EncodingKey,
    http: reqwest::Client,
    token: Mutex<Option<InstallationToken>>,
}

impl GithubAppClient {
    pub fn new(
        app_id: u64,
        installation_id: i64,
        api_base: impl Into<String>,
        private_key_pem: &[u8],
    ) -> Result<Self, GithubError> {
        let signing_key = EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| {
            GithubError::Configuration(format!("invalid GitHub App private key: {e}"))
        })?;

        Ok(Self {
            app_id,
            installation_id,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            signing_key,
            http: http_client()?,
            token: Mutex::new(None),
        })
    }

    pub fn installation_id(&self) -> i64 {
        self.installation_id
    }

    pub fn claims_at(&self, now: DateTime<Utc>) -> AppClaims {
        AppClaims {
            iat: now.timestamp() - JWT_BACKDATE_SECS,
            exp: now.timestamp() + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        }
    }

    /// Signs an App JWT valid at `now`
    pub fn app_jwt(&self, now: DateTime<Utc>) -> Result<String, GithubError> {
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &self.claims_at(now),
            &self.signing_key,
        )?)
    }

    /// Returns a cached installation token, minting a new one when it is
    /// missing or about to expire.
    async fn installation_token(&self) -> Result<String, GithubError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.expires_at - Duration::seconds(TOKEN_RENEW_MARGIN_SECS) > now
        {
            return Ok(token.token.clone());
        }

        let response = self
            .http
            .post(format!(
                "{}/app/installations/{}/access_tokens",
                self.api_base, self.installation_id
            ))
            .bearer_auth(self.app_jwt(now)?)
            .send()
            .await?;
        let minted: InstallationTokenResponse = read_json(response).await?;

        debug!(
            installation_id = self.installation_id,
            expires_at = %minted.expires_at,
            "Minted installation access token"
        );

        *cached = Some(InstallationToken {
            token: minted.token.clone(),
            expires_at: minted.expires_at,
        });
        Ok(minted.token)
    }

    /// Lists every repository the installation can access
    pub async fn list_repositories(&self) -> Result<Vec<Repository>, GithubError> {
        let token = self.installation_token().await?;
        let mut repositories = Vec::new();

        for page in 1.. {
            let response = self
                .http
                .get(format!("{}/installation/repositories", self.api_base))
                .bearer_auth(&token)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let batch: RepositoryPage = read_json(response).await?;
            let done = batch.repositories.len() < PER_PAGE;
            repositories.extend(batch.repositories);
            if done {
                break;
            }
        }

        Ok(repositories)
    }

    /// Lists branches of `owner/name`
    pub async fn list_branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>, GithubError> {
        let owner = repository_segment(owner)?;
        let name = repository_segment(name)?;
        let token = self.installation_token().await?;
        let mut branches = Vec::new();

        for page in 1.. {
            let response = self
                .http
                .get(format!("{}/repos/{}/{}/branches", self.api_base, owner, name))
                .bearer_auth(&token)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let batch: Vec<Branch> = read_json(response).await?;
            let done = batch.len() < PER_PAGE;
            branches.extend(batch);
            if done {
                break;
            }
        }

        Ok(branches)
    }
}

/// Accepts a GitHub owner or repository name as a single URL path segment.
/// GitHub limits both to ASCII letters, digits, `-`, `_` and `.`.
fn repository_segment(segment: &str) -> Result<&str, GithubError> {
    let valid = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(segment)
    } else {
        Err(GithubError::InvalidRepository(segment.to_string()))
    }
}

/// Hands out one [`GithubAppClient`] per installation, keeping recently used
/// clients (and their installation tokens) in an LRU cache.
pub struct GithubAppClientFactory {
    app_id: Option<u64>,
    secret_path: Option<PathBuf>,
    api_base: String,
    clients: Mutex<LruCache<i64, Arc<GithubAppClient>>>,
}

impl GithubAppClientFactory {
    pub fn new(config: &GithubAppConfig) -> Self {
        let capacity = NonZeroUsize::new(config.client_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            app_id: config.app_id,
            secret_path: config.secret_path.clone(),
            api_base: config.api_base.clone(),
            clients: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the client for `installation_id`, loading the App key on first use
    pub async fn client(&self, installation_id: i64) -> Result<Arc<GithubAppClient>, GithubError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&installation_id) {
            return Ok(Arc::clone(client));
        }

        let app_id = self
            .app_id
            .ok_or_else(|| GithubError::Configuration("GitHub App id is not set".into()))?;
        let secret_path = self.secret_path.as_ref().ok_or_else(|| {
            GithubError::Configuration("GitHub App private key path is not set".into())
        })?;
        let pem = tokio::fs::read(secret_path).await.map_err(|e| {
            GithubError::Configuration(format!(
                "failed to read GitHub App private key {}: {e}",
                secret_path.display()
            ))
        })?;

        let client = Arc::new(GithubAppClient::new(
            app_id,
            installation_id,
            &self.api_base,
            &pem,
        )?);
        clients.put(installation_id, Arc::clone(&client));

        info!(installation_id, "Created GitHub App installation client");
        Ok(client)
    }
}
