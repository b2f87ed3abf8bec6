use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::auth::UserHeader;
use crate::context::RequestContext;
use crate::error::{ApiError, validation_error};
use crate::models::{InfraKind, InfraResponse};
use crate::provision::ProvisionRequest;
use crate::server::AppState;

/// Starts provisioning an infrastructure resource for a project
#[utoipa::path(
    post,
    path = "/api/projects/{project_id}/provision/{kind}",
    security(("bearer_auth" = [])),
    params(
        UserHeader,
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("kind" = InfraKind, Path, description = "Resource kind (gcr, gke)")
    ),
    request_body = ProvisionRequest,
    responses(
        (status = 201, description = "Provisioning started; poll the infra record for progress", body = InfraResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Project or cloud integration not accessible", body = ApiError),
        (status = 500, description = "Provisioning could not be started", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn provision_infra(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((_project_id, kind)): Path<(Uuid, String)>,
    payload: Result<Json<ProvisionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InfraResponse>), ApiError> {
    let kind = kind.parse::<InfraKind>().map_err(|message| {
        validation_error("Invalid infra kind", serde_json::json!({ "kind": message }))
    })?;
    let Json(request) = payload?;

    let infra = state.provisioner.provision(&ctx, kind, request).await?;

    Ok((StatusCode::CREATED, Json(infra.into())))
}
