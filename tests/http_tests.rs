//! Router-level tests: authentication, request context resolution and the
//! JSON shapes of the public endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use chrono::{Duration, Utc};
use gantry::config::AppConfig;
use gantry::server::{AppState, create_app};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{
    create_test_gcp_integration, create_test_installation, create_test_oauth_integration,
    create_test_project, create_test_user, setup_test_db_arc,
};

const OPERATOR_TOKEN: &str = "test-operator-token";

fn test_config(github_api_base: Option<String>) -> AppConfig {
    let mut config = AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        ..Default::default()
    };
    config.provisioner.image_tag = "v1.4.0".to_string();
    config.github_app.app_id = Some(1001);
    config.github_app.secret_path = Some(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/github_app_test_key.pem"),
    );
    if let Some(base) = github_api_base {
        config.github_app.api_base = base;
    }
    config
}

fn app(db: &Arc<DatabaseConnection>, config: AppConfig) -> Router {
    let state = AppState::from_config(Arc::new(config), (**db).clone()).unwrap();
    create_app(state)
}

fn get(uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {OPERATOR_TOKEN}"));
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {OPERATOR_TOKEN}"))
        .header("X-User-Id", user.to_string())
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_and_healthz_are_public() {
    let db = setup_test_db_arc().await.unwrap();
    let app = app(&db, test_config(None));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["service"], "gantry");

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let db = setup_test_db_arc().await.unwrap();
    let response = app(&db, test_config(None))
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn protected_route_requires_operator_token() {
    let db = setup_test_db_arc().await.unwrap();
    let uri = format!("/api/projects/{}/infras", Uuid::new_v4());

    let response = app(&db, test_config(None))
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()["content-type"],
        "application/problem+json"
    );
}

#[tokio::test]
async fn unknown_user_is_unauthorized() {
    let db = setup_test_db_arc().await.unwrap();
    let uri = format!("/api/projects/{}/infras", Uuid::new_v4());

    let response = app(&db, test_config(None))
        .oneshot(get(&uri, Some(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn project_of_another_user_is_forbidden() {
    let db = setup_test_db_arc().await.unwrap();
    let owner = create_test_user(&db).await.unwrap();
    let intruder = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, owner.id).await.unwrap();

    let response = app(&db, test_config(None))
        .oneshot(get(
            &format!("/api/projects/{}/infras", project.id),
            Some(intruder.id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn provision_then_list_and_fetch_infra() {
    let db = setup_test_db_arc().await.unwrap();
    let user = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, user.id).await.unwrap();
    let integration = create_test_gcp_integration(&db, project.id, user.id)
        .await
        .unwrap();
    let app = app(&db, test_config(None));

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/projects/{}/provision/gke", project.id),
            user.id,
            json!({ "gcp_integration_id": integration.id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["kind"], "gke");
    assert_eq!(created["status"], "creating");
    let infra_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/projects/{}/infras", project.id),
            Some(user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed["infras"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/projects/{}/infras/{}", project.id, infra_id),
            Some(user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], infra_id.as_str());

    let response = app
        .oneshot(get(
            &format!("/api/projects/{}/infras/{}", project.id, Uuid::new_v4()),
            Some(user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provision_rejects_unknown_kind_and_foreign_integration() {
    let db = setup_test_db_arc().await.unwrap();
    let user = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, user.id).await.unwrap();
    let app = app(&db, test_config(None));

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/projects/{}/provision/eks", project.id),
            user.id,
            json!({ "gcp_integration_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            &format!("/api/projects/{}/provision/gcr", project.id),
            user.id,
            json!({ "gcp_integration_id": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn accounts_require_a_linked_github_authorization() {
    let db = setup_test_db_arc().await.unwrap();
    let user = create_test_user(&db).await.unwrap();

    let response = app(&db, test_config(None))
        .oneshot(get("/api/integrations/github-app/accounts", Some(user.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn accounts_are_listed_with_the_users_token() {
    let db = setup_test_db_arc().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/installations"))
        .and(header("authorization", "Bearer gho_live"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "installations": [{ "id": 42, "account": { "id": 7, "login": "octo-org" } }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = create_test_user(&db).await.unwrap();
    create_test_oauth_integration(&db, user.id, "gho_live", "ghr_live", Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let response = app(&db, test_config(Some(server.uri())))
        .oneshot(get("/api/integrations/github-app/accounts", Some(user.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "accounts": [{ "installation_id": 42, "account_id": 7, "login": "octo-org" }] })
    );
}

#[tokio::test]
async fn unregistered_installation_is_forbidden() {
    let db = setup_test_db_arc().await.unwrap();
    let user = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, user.id).await.unwrap();

    let response = app(&db, test_config(None))
        .oneshot(get(
            &format!("/api/projects/{}/gitrepos/999/repos", project.id),
            Some(user.id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repositories_and_branches_use_installation_token() {
    let db = setup_test_db_arc().await.unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_installation",
            "expires_at": "2099-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/installation/repositories"))
        .and(header("authorization", "Bearer ghs_installation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "repositories": [{
                "id": 1296269,
                "name": "hello-world",
                "full_name": "octo-org/hello-world",
                "private": false,
                "default_branch": "main",
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/hello-world/branches"))
        .and(header("authorization", "Bearer ghs_installation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "main", "protected": true },
            { "name": "feature/login", "protected": false },
        ])))
        .mount(&server)
        .await;

    let user = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, user.id).await.unwrap();
    create_test_installation(&db, project.id, 7, 42).await.unwrap();
    let app = app(&db, test_config(Some(server.uri())));

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/projects/{}/gitrepos/42/repos", project.id),
            Some(user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["repositories"][0]["full_name"], "octo-org/hello-world");

    let response = app
        .oneshot(get(
            &format!(
                "/api/projects/{}/gitrepos/42/repos/octo-org/hello-world/branches",
                project.id
            ),
            Some(user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["branches"][1]["name"], "feature/login");
}

#[tokio::test]
async fn installation_of_another_users_project_is_forbidden() {
    let db = setup_test_db_arc().await.unwrap();
    let owner = create_test_user(&db).await.unwrap();
    let owner_project = create_test_project(&db, owner.id).await.unwrap();
    create_test_installation(&db, owner_project.id, 7, 42).await.unwrap();

    let other = create_test_user(&db).await.unwrap();
    let other_project = create_test_project(&db, other.id).await.unwrap();
    let app = app(&db, test_config(None));

    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/projects/{}/gitrepos/42/repos", other_project.id),
            Some(other.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(get(
            &format!(
                "/api/projects/{}/gitrepos/42/repos/octo-org/hello-world/branches",
                other_project.id
            ),
            Some(other.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn branch_listing_rejects_encoded_path_segments() {
    let db = setup_test_db_arc().await.unwrap();
    let server = MockServer::start().await;
    let user = create_test_user(&db).await.unwrap();
    let project = create_test_project(&db, user.id).await.unwrap();
    create_test_installation(&db, project.id, 7, 42).await.unwrap();

    let response = app(&db, test_config(Some(server.uri())))
        .oneshot(get(
            &format!(
                "/api/projects/{}/gitrepos/42/repos/..%2Fapp/installations/branches",
                project.id
            ),
            Some(user.id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}
