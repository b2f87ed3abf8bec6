//! # GitHub Handlers
//!
//! Listing the user's App installations and the repositories of one
//! installation.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::UserHeader;
use crate::context::RequestContext;
use crate::error::{ApiError, forbidden};
use crate::github::{Branch, InstallationAccount, Repository};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountsResponse {
    pub accounts: Vec<InstallationAccount>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RepositoriesResponse {
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BranchesResponse {
    pub branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
pub struct RepoPath {
    pub owner: String,
    pub name: String,
}

/// Lists GitHub accounts the user has installed the App on
#[utoipa::path(
    get,
    path = "/api/integrations/github-app/accounts",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Installed accounts", body = AccountsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "GitHub App not authorized by the user", body = ApiError),
        (status = 502, description = "GitHub unavailable", body = ApiError)
    ),
    tag = "github"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<AccountsResponse>, ApiError> {
    let token = state.token_lifecycle.resolve_token(&ctx).await?;
    let accounts = state.github_users.list_installations(&token).await?;

    Ok(Json(AccountsResponse { accounts }))
}

/// Lists repositories visible to a GitHub App installation
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/gitrepos/{installation_id}/repos",
    security(("bearer_auth" = [])),
    params(
        UserHeader,
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("installation_id" = i64, Path, description = "GitHub App installation ID")
    ),
    responses(
        (status = 200, description = "Repositories", body = RepositoriesResponse),
        (status = 403, description = "Project or installation not accessible", body = ApiError),
        (status = 502, description = "GitHub error", body = ApiError)
    ),
    tag = "github"
)]
pub async fn list_repositories(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<RepositoriesResponse>, ApiError> {
    let installation = ctx
        .installation
        .as_ref()
        .ok_or_else(|| forbidden(Some("GitHub App installation is not registered")))?;

    let client = state.github_apps.client(installation.installation_id).await?;
    let repositories = client.list_repositories().await?;

    Ok(Json(RepositoriesResponse { repositories }))
}

/// Lists branches of one repository
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/gitrepos/{installation_id}/repos/{owner}/{name}/branches",
    security(("bearer_auth" = [])),
    params(
        UserHeader,
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("installation_id" = i64, Path, description = "GitHub App installation ID"),
        ("owner" = String, Path, description = "Repository owner"),
        ("name" = String, Path, description = "Repository name")
    ),
    responses(
        (status = 200, description = "Branches", body = BranchesResponse),
        (status = 400, description = "Invalid repository owner or name", body = ApiError),
        (status = 403, description = "Project or installation not accessible", body = ApiError),
        (status = 502, description = "GitHub error", body = ApiError)
    ),
    tag = "github"
)]
pub async fn list_branches(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(repo): Path<RepoPath>,
) -> Result<Json<BranchesResponse>, ApiError> {
    let installation = ctx
        .installation
        .as_ref()
        .ok_or_else(|| forbidden(Some("GitHub App installation is not registered")))?;

    let client = state.github_apps.client(installation.installation_id).await?;
    let branches = client.list_branches(&repo.owner, &repo.name).await?;

    Ok(Json(BranchesResponse { branches }))
}
