//! Database migrations for the gantry API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000001_create_users;
mod m2026_01_05_000002_create_projects;
mod m2026_01_05_000003_create_github_app_oauth_integrations;
mod m2026_01_05_000004_create_github_app_installations;
mod m2026_01_05_000005_create_gcp_integrations;
mod m2026_01_05_000006_create_infras;
mod m2026_01_05_000007_create_provision_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000001_create_users::Migration),
            Box::new(m2026_01_05_000002_create_projects::Migration),
            Box::new(m2026_01_05_000003_create_github_app_oauth_integrations::Migration),
            Box::new(m2026_01_05_000004_create_github_app_installations::Migration),
            Box::new(m2026_01_05_000005_create_gcp_integrations::Migration),
            Box::new(m2026_01_05_000006_create_infras::Migration),
            Box::new(m2026_01_05_000007_create_provision_jobs::Migration),
        ]
    }
}
