use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::models::{InfraKind, InfraStatus, infra};
use crate::repositories::{CloudIntegrationStore, InfraStore, NewInfra, StoreError};

use super::{
    AgentError, DatastoreConfig, Operation, ProvisionOpts, ProvisionerAgent, generate_suffix,
    keep_primary,
};

/// Body of a provisioning request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProvisionRequest {
    /// GCP integration whose service account owns the new resources
    pub gcp_integration_id: Uuid,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("infra store failure: {0}")]
    Store(#[from] StoreError),
    #[error("failed to generate infra suffix: {0}")]
    Randomness(#[from] rand::Error),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ProvisionError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ProvisionError::Forbidden(_))
    }
}

/// Deployment settings handed to every provisioning job
#[derive(Debug, Clone, Default)]
pub struct ProvisionSettings {
    pub image_tag: String,
    pub image_pull_secret: Option<String>,
    pub datastore: DatastoreConfig,
}

impl ProvisionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_tag: config.provisioner.image_tag.clone(),
            image_pull_secret: config.provisioner.image_pull_secret.clone(),
            datastore: DatastoreConfig {
                database_url: config.database_url.clone(),
                redis_url: config.redis_url.clone(),
            },
        }
    }
}

/// Allocates infra records and dispatches them to the provisioning agent
pub struct Provisioner {
    integrations: Arc<dyn CloudIntegrationStore>,
    infras: Arc<dyn InfraStore>,
    agent: Arc<dyn ProvisionerAgent>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: ProvisionSettings,
}

impl Provisioner {
    pub fn new(
        integrations: Arc<dyn CloudIntegrationStore>,
        infras: Arc<dyn InfraStore>,
        agent: Arc<dyn ProvisionerAgent>,
        analytics: Arc<dyn AnalyticsSink>,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            integrations,
            infras,
            agent,
            analytics,
            settings,
        }
    }

    /// Starts provisioning `kind` for the request's project.
    ///
    /// Returns the record in `creating` once the agent has accepted the work.
    /// When the agent refuses, the record is moved to `error` before the agent's
    /// error is returned.
    #[instrument(skip_all, fields(user_id = %ctx.user.id, kind = kind.as_str()))]
    pub async fn provision(
        &self,
        ctx: &RequestContext,
        kind: InfraKind,
        request: ProvisionRequest,
    ) -> Result<infra::Model, ProvisionError> {
        let project = ctx
            .project
            .as_ref()
            .ok_or_else(|| ProvisionError::Forbidden("request is not scoped to a project".into()))?;

        let credential = self
            .integrations
            .read_gcp(project.id, request.gcp_integration_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => ProvisionError::Forbidden(format!(
                    "GCP integration {} is not available to project {}",
                    request.gcp_integration_id, project.id
                )),
                other => ProvisionError::Store(other),
            })?;

        let suffix = generate_suffix()?;

        let mut record = self
            .infras
            .create(NewInfra {
                project_id: project.id,
                kind,
                suffix,
                status: InfraStatus::Creating,
                gcp_integration_id: Some(credential.id),
                created_by_user_id: ctx.user.id,
            })
            .await?;

        let opts = ProvisionOpts {
            project_id: project.id,
            infra: record.clone(),
            operation: Operation::Apply,
            image_tag: self.settings.image_tag.clone(),
            image_pull_secret: self.settings.image_pull_secret.clone(),
            datastore: self.settings.datastore.clone(),
        };

        let handle = match self.agent.provision(opts, &credential).await {
            Ok(handle) => handle,
            Err(agent_err) => {
                record.status = InfraStatus::Error;
                let compensation = self.infras.update(&record).await;
                return Err(keep_primary(ProvisionError::Agent(agent_err), compensation));
            }
        };

        info!(
            infra_id = %record.id,
            job_id = %handle.job_id,
            suffix = %record.suffix,
            "Provisioning job accepted"
        );

        self.analytics.track(AnalyticsEvent::provisioning_start(
            kind,
            ctx.user.id,
            project.id,
            record.id,
        ));

        Ok(record)
    }
}
