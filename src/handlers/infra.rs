//! # Infra Handlers
//!
//! Read access to infra records so clients can follow provisioning progress.

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
use crate::models::{InfraResponse, project};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InfrasResponse {
    pub infras: Vec<InfraResponse>,
}

fn scoped_project(ctx: &RequestContext) -> Result<&project::Model, ApiError> {
    ctx.project
        .as_ref()
        .ok_or_else(|| forbidden(Some("Request is not scoped to a project")))
}

/// Lists the project's infra records, oldest first
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/infras",
    security(("bearer_auth" = [])),
    params(UserHeader, ("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Infra records", body = InfrasResponse),
        (status = 403, description = "Project not accessible", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn list_infras(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<InfrasResponse>, ApiError> {
    let project = scoped_project(&ctx)?;
    let infras = state.infras.list_by_project(project.id).await?;

    Ok(Json(InfrasResponse {
        infras: infras.into_iter().map(InfraResponse::from).collect(),
    }))
}

/// Returns one infra record
#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/infras/{infra_id}",
    security(("bearer_auth" = [])),
    params(
        UserHeader,
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("infra_id" = Uuid, Path, description = "Infra record ID")
    ),
    responses(
        (status = 200, description = "Infra record", body = InfraResponse),
        (status = 403, description = "Project not accessible", body = ApiError),
        (status = 404, description = "No such record in this project", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn get_infra(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((_project_id, infra_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InfraResponse>, ApiError> {
    let project = scoped_project(&ctx)?;
    let infra = state.infras.find(project.id, infra_id).await?;

    Ok(Json(infra.into()))
}
