//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities. Lookups that callers must classify (missing record versus
//! storage fault) return [`StoreError`] so the distinction survives to the call site.

use sea_orm::DbErr;
use thiserror::Error;

pub mod gcp_integration;
pub mod infra;
pub mod installation;
pub mod oauth_integration;
pub mod project;
pub mod provision_job;
pub mod user;

pub use gcp_integration::{CloudIntegrationStore, GcpIntegrationRepository, NewGcpIntegration};
pub use infra::{InfraRepository, InfraStore, NewInfra};
pub use installation::InstallationRepository;
pub use oauth_integration::{CredentialStore, OAuthIntegrationRepository};
pub use project::ProjectRepository;
pub use provision_job::ProvisionJobRepository;
pub use user::UserRepository;

/// Errors surfaced by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} '{id}' rejected update: {reason}")]
    Conflict {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(
        entity: &'static str,
        id: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        StoreError::Conflict {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
