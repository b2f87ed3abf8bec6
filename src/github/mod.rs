//! # GitHub Clients
//!
//! Two ways of talking to GitHub: as the App on behalf of one installation
//! ([`GithubAppClient`], minted through [`GithubAppClientFactory`]) and as the
//! user with their user-to-server token ([`GithubUserClient`]).

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use thiserror::Error;

mod app;
mod types;
mod user;

pub use app::{AppClaims, GithubAppClient, GithubAppClientFactory};
pub use types::{Branch, InstallationAccount, Repository};
pub use user::GithubUserClient;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub App is not configured: {0}")]
    Configuration(String),

    #[error("failed to sign GitHub App JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("GitHub API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid repository path segment: {0:?}")]
    InvalidRepository(String),
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("gantry/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(
        "X-GitHub-Api-Version",
        HeaderValue::from_static(GITHUB_API_VERSION),
    );
    headers
}

pub(crate) fn http_client() -> Result<reqwest::Client, GithubError> {
    Ok(reqwest::Client::builder()
        .default_headers(default_headers())
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Decodes a successful response or converts the failure into [`GithubError::Api`]
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GithubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GithubError::Api {
        status: status.as_u16(),
        message: body,
    })
}
