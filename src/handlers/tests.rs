//! # Tests for Handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::{Database, DatabaseConnection};

use crate::config::AppConfig;
use crate::handlers::{healthz, root};
use crate::server::AppState;

fn test_state(db: DatabaseConnection) -> AppState {
    let config = Arc::new(AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec!["test-token".to_string()],
        ..Default::default()
    });
    AppState::from_config(config, db).expect("state builds in test profile")
}

#[tokio::test]
async fn root_returns_service_info() {
    let axum::Json(info) = root().await;

    assert_eq!(info.service, "gantry");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn healthz_reports_ok_with_reachable_database() {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let axum::Json(health) = healthz(State(test_state(db))).await.unwrap();

    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn healthz_returns_503_when_database_is_disconnected() {
    let err = healthz(State(test_state(DatabaseConnection::default())))
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
}
