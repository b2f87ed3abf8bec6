//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with migrations applied and inserts
//! fixture rows through the repositories.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use gantry::models::{gcp_integration, github_app_installation, project, user};
use gantry::repositories::{
    GcpIntegrationRepository, InstallationRepository, NewGcpIntegration,
    OAuthIntegrationRepository, ProjectRepository, UserRepository,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // Fixtures are inserted per test without their full parent graph.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied and returns an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Truncates to whole seconds so stored and in-memory expiries compare equal.
#[allow(dead_code)]
pub fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0)
        .single()
        .unwrap_or(at)
}

#[allow(dead_code)]
pub async fn create_test_user(db: &Arc<DatabaseConnection>) -> Result<user::Model> {
    let email = format!("user-{}@example.com", Uuid::new_v4().simple());
    Ok(UserRepository::new(Arc::clone(db)).create(&email, None).await?)
}

#[allow(dead_code)]
pub async fn create_test_project(
    db: &Arc<DatabaseConnection>,
    owner_user_id: Uuid,
) -> Result<project::Model> {
    Ok(ProjectRepository::new(Arc::clone(db))
        .create("test-project", owner_user_id)
        .await?)
}

#[allow(dead_code)]
pub async fn create_test_gcp_integration(
    db: &Arc<DatabaseConnection>,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<gcp_integration::Model> {
    Ok(GcpIntegrationRepository::new(Arc::clone(db))
        .create(NewGcpIntegration {
            project_id,
            user_id,
            gcp_project_id: "gantry-test".to_string(),
            gcp_sa_email: "provisioner@gantry-test.iam.gserviceaccount.com".to_string(),
            gcp_region: Some("us-central1".to_string()),
            key_data: br#"{"type":"service_account"}"#.to_vec(),
        })
        .await?)
}

/// Stores a GitHub App credential and links it to `user_id`, returning the
/// integration id.
#[allow(dead_code)]
pub async fn create_test_oauth_integration(
    db: &Arc<DatabaseConnection>,
    user_id: Uuid,
    access_token: &str,
    refresh_token: &str,
    expiry: DateTime<Utc>,
) -> Result<Uuid> {
    let integration = OAuthIntegrationRepository::new(Arc::clone(db))
        .create(
            user_id,
            access_token.as_bytes(),
            refresh_token.as_bytes(),
            whole_seconds(expiry),
        )
        .await?;
    UserRepository::new(Arc::clone(db))
        .link_github_app_integration(user_id, integration.id)
        .await?;
    Ok(integration.id)
}

#[allow(dead_code)]
pub async fn create_test_installation(
    db: &Arc<DatabaseConnection>,
    project_id: Uuid,
    account_id: i64,
    installation_id: i64,
) -> Result<github_app_installation::Model> {
    Ok(InstallationRepository::new(Arc::clone(db))
        .create(project_id, account_id, installation_id)
        .await?)
}
