//! # Request Context
//!
//! Resolves the principal and target resources of a request once, before the
//! handler runs. Core operations receive the resulting [`RequestContext`]
//! instead of reading ambient request state.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, forbidden, unauthorized, validation_error};
use crate::models::{github_app_installation, project, user};
use crate::server::AppState;

/// Authorized principal and the resources the request targets
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: user::Model,
    /// Present on `/projects/{project_id}/...` routes; owned by `user`
    pub project: Option<project::Model>,
    /// Present on routes with an `{installation_id}` segment; registered for `project`
    pub installation: Option<github_app_installation::Model>,
}

impl RequestContext {
    /// Context for a user acting outside any project
    pub fn for_user(user: user::Model) -> Self {
        Self {
            user,
            project: None,
            installation: None,
        }
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user_id) = parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| unauthorized(Some("User authentication required")))?;

        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| unauthorized(Some("Unknown user")))?;

        let params = match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Path(params)) => params,
            Err(_) => HashMap::new(),
        };

        let project = match params.get("project_id") {
            Some(raw) => {
                let project_id = raw.parse::<Uuid>().map_err(|_| {
                    validation_error(
                        "Invalid project ID",
                        serde_json::json!({ "project_id": "Must be a valid UUID" }),
                    )
                })?;
                let project = state
                    .projects
                    .find_by_id(project_id)
                    .await?
                    .filter(|project| project.owner_user_id == user.id)
                    .ok_or_else(|| forbidden(Some("Project is not accessible to this user")))?;
                Some(project)
            }
            None => None,
        };

        let installation = match params.get("installation_id") {
            Some(raw) => {
                let installation_id = raw.parse::<i64>().map_err(|_| {
                    validation_error(
                        "Invalid installation ID",
                        serde_json::json!({ "installation_id": "Must be an integer" }),
                    )
                })?;
                // Installations are only reachable through the project they were registered for
                let project = project
                    .as_ref()
                    .ok_or_else(|| forbidden(Some("GitHub App installation requires a project")))?;
                let installation = state
                    .installations
                    .find_for_project(project.id, installation_id)
                    .await?
                    .ok_or_else(|| {
                        forbidden(Some("GitHub App installation is not registered for this project"))
                    })?;
                Some(installation)
            }
            None => None,
        };

        tracing::debug!(
            user_id = %user.id,
            project_id = ?project.as_ref().map(|p| p.id),
            installation_id = ?installation.as_ref().map(|i| i.installation_id),
            "Resolved request context"
        );

        Ok(Self {
            user,
            project,
            installation,
        })
    }
}
