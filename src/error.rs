//! # Error Handling
//!
//! Unified `application/problem+json` errors for the gantry API, with trace ID
//! propagation and mappings from the domain error types. Internal failures are
//! logged in full and answered with a generic message.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::github::GithubError;
use crate::oauth::{ExchangeError, TokenError};
use crate::provision::ProvisionError;
use crate::repositories::StoreError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Trace ID of the active request, or a generated correlation ID outside one
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    db_error.is_unique_violation()
        || db_error
            .code()
            .is_some_and(|code| code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
}

/// Upstream provider error information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderError {
    /// Provider identifier
    pub provider: String,
    /// HTTP status code from upstream
    pub status: u16,
    /// Response body snippet from upstream (truncated)
    pub body_snippet: Option<String>,
}

fn internal_error(message: &str) -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_SERVER_ERROR",
        message,
    )
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                internal_error("Database error occurred")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("{entity} '{id}' not found"),
            ),
            StoreError::Conflict { .. } => {
                tracing::warn!(error = %error, "Store rejected update");
                Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource was modified concurrently")
            }
            StoreError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::NotLinked { .. }
            | TokenError::Store(StoreError::NotFound { .. }) => {
                forbidden(Some("GitHub App is not authorized for this user"))
            }
            TokenError::MissingRefreshToken { .. } | TokenError::Exchange(ExchangeError::Rejected(_)) => {
                tracing::warn!(error = %error, "GitHub authorization can no longer be refreshed");
                forbidden(Some("GitHub authorization expired; authorize the GitHub App again"))
            }
            TokenError::Exchange(ExchangeError::Transport(ref detail)) => {
                tracing::error!(error = %detail, "GitHub token endpoint unreachable");
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "GitHub token endpoint is unavailable",
                )
            }
            other => {
                tracing::error!(error = %other, "Failed to resolve GitHub token");
                internal_error("An internal error occurred")
            }
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(error: ProvisionError) -> Self {
        if error.is_forbidden() {
            tracing::info!(error = %error, "Provisioning request refused");
            return forbidden(Some("Cloud integration is not accessible to this project"));
        }

        tracing::error!(error = %error, "Provisioning failed");
        internal_error("An internal error occurred")
    }
}

impl From<GithubError> for ApiError {
    fn from(error: GithubError) -> Self {
        match error {
            GithubError::Api { status, message } => {
                provider_error("github".to_string(), status, Some(message))
            }
            GithubError::InvalidRepository(segment) => validation_error(
                "Invalid repository owner or name",
                serde_json::json!({ "repository": format!("{segment:?} is not a valid GitHub name") }),
            ),
            GithubError::Network(ref e) => {
                tracing::error!(error = %e, "GitHub request failed");
                ApiError::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", "GitHub is unavailable")
            }
            other => {
                tracing::error!(error = %other, "GitHub client error");
                internal_error("An internal error occurred")
            }
        }
    }
}

/// Create a provider upstream error (502 PROVIDER_ERROR)
pub fn provider_error(provider: String, status: u16, body: Option<String>) -> ApiError {
    let provider_error = ProviderError {
        provider: provider.clone(),
        status,
        body_snippet: body.map(|b| {
            if b.chars().count() > 200 {
                let truncated: String = b.chars().take(200).collect();
                format!("{}...", truncated)
            } else {
                b
            }
        }),
    };

    ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        &format!("Provider {} returned error status {}", provider, status),
    )
    .with_details(json!(provider_error))
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Insufficient permissions");
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::AgentError;
    use uuid::Uuid;

    #[test]
    fn content_type_is_problem_json() {
        let response = forbidden(None).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn trace_id_falls_back_to_correlation_id() {
        let error = unauthorized(None);
        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[tokio::test]
    async fn trace_id_comes_from_request_scope() {
        let error = telemetry::with_trace_context(
            telemetry::TraceContext {
                trace_id: "req-1".into(),
            },
            async { forbidden(None) },
        )
        .await;

        assert_eq!(error.trace_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn store_errors_map_to_status() {
        let not_found: ApiError = StoreError::not_found("infra", Uuid::nil()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let conflict: ApiError = StoreError::conflict("infra", Uuid::nil(), "stale").into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn provision_forbidden_maps_to_403_and_other_failures_to_500() {
        let forbidden: ApiError = ProvisionError::Forbidden("no integration".into()).into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.code.as_ref(), "FORBIDDEN");

        let internal: ApiError =
            ProvisionError::Agent(AgentError::Rejected("missing image".into())).into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code.as_ref(), "INTERNAL_SERVER_ERROR");
        assert!(!internal.message.contains("missing image"));
    }

    #[test]
    fn token_errors_map_to_status() {
        let not_linked: ApiError = TokenError::NotLinked {
            user_id: Uuid::nil(),
        }
        .into();
        assert_eq!(not_linked.status, StatusCode::FORBIDDEN);

        let revoked: ApiError =
            TokenError::Exchange(ExchangeError::Rejected("bad_refresh_token".into())).into();
        assert_eq!(revoked.status, StatusCode::FORBIDDEN);

        let unreachable: ApiError =
            TokenError::Exchange(ExchangeError::Transport("timeout".into())).into();
        assert_eq!(unreachable.status, StatusCode::BAD_GATEWAY);

        let db: ApiError = TokenError::Store(StoreError::Database(sea_orm::DbErr::Custom(
            "boom".into(),
        )))
        .into();
        assert_eq!(db.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn github_api_errors_become_provider_errors() {
        let error: ApiError = GithubError::Api {
            status: 404,
            message: "Not Found".into(),
        }
        .into();

        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error.code.as_ref(), "PROVIDER_ERROR");
        let details = error.details.unwrap();
        assert_eq!(details["provider"], "github");
        assert_eq!(details["status"], 404);
    }

    #[test]
    fn provider_error_truncates_on_char_boundaries() {
        let body = "ünïcödé ".repeat(60);
        let error = provider_error("github".to_string(), 500, Some(body));

        let details = error.details.unwrap();
        let snippet = details["body_snippet"].as_str().unwrap();
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 203);
    }
}
