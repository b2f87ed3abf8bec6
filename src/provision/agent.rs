//! Provisioning agent boundary.
//!
//! The agent accepts work for asynchronous execution; what it does with the
//! work (cluster creation, registry setup) happens out of process.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::strip_password;
use crate::models::{gcp_integration, infra};
use crate::repositories::{ProvisionJobRepository, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Apply,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Apply => "apply",
        }
    }
}

/// Datastores the provisioning job reports progress to
#[derive(Debug, Clone, Default)]
pub struct DatastoreConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
}

/// Everything the agent needs to launch one provisioning job
#[derive(Debug, Clone)]
pub struct ProvisionOpts {
    pub project_id: Uuid,
    pub infra: infra::Model,
    pub operation: Operation,
    pub image_tag: String,
    pub image_pull_secret: Option<String>,
    pub datastore: DatastoreConfig,
}

/// Receipt for accepted work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedHandle {
    pub job_id: Uuid,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provisioning request rejected: {0}")]
    Rejected(String),
    #[error("failed to dispatch provisioning job: {0}")]
    Dispatch(#[from] StoreError),
}

/// Launches asynchronous provisioning work
#[async_trait]
pub trait ProvisionerAgent: Send + Sync {
    async fn provision(
        &self,
        opts: ProvisionOpts,
        credential: &gcp_integration::Model,
    ) -> Result<AcceptedHandle, AgentError>;
}

/// Agent that hands jobs to an out-of-process runner through the
/// `provision_jobs` table.
///
/// The job spec references the cloud credential by id; key material stays in
/// `gcp_integrations`.
pub struct JobQueueAgent {
    jobs: Arc<ProvisionJobRepository>,
}

impl JobQueueAgent {
    pub fn new(jobs: Arc<ProvisionJobRepository>) -> Self {
        Self { jobs }
    }

    fn job_spec(opts: &ProvisionOpts, credential: &gcp_integration::Model) -> serde_json::Value {
        json!({
            "kind": opts.infra.kind,
            "suffix": opts.infra.suffix,
            "operation": opts.operation,
            "image": {
                "tag": opts.image_tag,
                "pull_secret": opts.image_pull_secret,
            },
            "datastore": {
                "database_url": strip_password(&opts.datastore.database_url),
                "redis_url": opts.datastore.redis_url.as_deref().map(strip_password),
            },
            "gcp": {
                "integration_id": credential.id,
                "project_id": credential.gcp_project_id,
                "service_account": credential.gcp_sa_email,
                "region": credential.gcp_region,
            },
        })
    }
}

#[async_trait]
impl ProvisionerAgent for JobQueueAgent {
    async fn provision(
        &self,
        opts: ProvisionOpts,
        credential: &gcp_integration::Model,
    ) -> Result<AcceptedHandle, AgentError> {
        if opts.image_tag.trim().is_empty() {
            return Err(AgentError::Rejected(
                "provisioner image tag is not configured".to_string(),
            ));
        }
        if opts.infra.project_id != opts.project_id || credential.project_id != opts.project_id {
            return Err(AgentError::Rejected(
                "infra record and credential must belong to the requesting project".to_string(),
            ));
        }

        let spec = Self::job_spec(&opts, credential);
        let job = self
            .jobs
            .enqueue(opts.infra.id, opts.project_id, opts.operation.as_str(), spec)
            .await?;

        Ok(AcceptedHandle { job_id: job.id })
    }
}
