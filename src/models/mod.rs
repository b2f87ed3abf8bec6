//! # Data Models
//!
//! This module contains all the data models used throughout the gantry API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod gcp_integration;
pub mod github_app_installation;
pub mod github_app_oauth_integration;
pub mod infra;
pub mod project;
pub mod provision_job;
pub mod user;

pub use gcp_integration::Entity as GcpIntegration;
pub use github_app_installation::Entity as GithubAppInstallation;
pub use github_app_oauth_integration::Entity as GithubAppOauthIntegration;
pub use infra::{Entity as Infra, InfraKind, InfraResponse, InfraStatus};
pub use project::Entity as Project;
pub use provision_job::Entity as ProvisionJob;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "gantry".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
