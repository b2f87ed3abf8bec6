use tracing::debug;

use super::types::InstallationPage;
use super::{GithubError, InstallationAccount, PER_PAGE, http_client, read_json};
use crate::oauth::BearerToken;

/// Client acting as a user through their GitHub App user-to-server token
pub struct GithubUserClient {
    api_base: String,
    http: reqwest::Client,
}

impl GithubUserClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self, GithubError> {
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http: http_client()?,
        })
    }

    /// Lists App installations the user can access
    pub async fn list_installations(
        &self,
        token: &BearerToken,
    ) -> Result<Vec<InstallationAccount>, GithubError> {
        let mut accounts = Vec::new();

        for page in 1.. {
            let response = self
                .http
                .get(format!("{}/user/installations", self.api_base))
                .header(reqwest::header::AUTHORIZATION, token.authorization())
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let batch: InstallationPage = read_json(response).await?;
            let done = batch.installations.len() < PER_PAGE;
            accounts.extend(batch.installations.into_iter().map(InstallationAccount::from));
            if done {
                break;
            }
        }

        debug!(count = accounts.len(), "Listed user installations");
        Ok(accounts)
    }
}
