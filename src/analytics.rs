//! # Analytics
//!
//! Fire-and-forget product analytics. Tracking never fails the caller: sinks
//! log delivery problems and move on.

use std::time::Duration;

use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::models::InfraKind;

/// Events emitted by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A registry provisioning job was accepted
    RegistryProvisioningStart {
        user_id: Uuid,
        project_id: Uuid,
        infra_id: Uuid,
        registry_type: InfraKind,
    },
    /// A cluster provisioning job was accepted
    ClusterProvisioningStart {
        user_id: Uuid,
        project_id: Uuid,
        infra_id: Uuid,
        cluster_type: InfraKind,
    },
}

impl AnalyticsEvent {
    /// Start event for a provisioning request of `kind`
    pub fn provisioning_start(kind: InfraKind, user_id: Uuid, project_id: Uuid, infra_id: Uuid) -> Self {
        match kind {
            InfraKind::Gcr => AnalyticsEvent::RegistryProvisioningStart {
                user_id,
                project_id,
                infra_id,
                registry_type: kind,
            },
            InfraKind::Gke => AnalyticsEvent::ClusterProvisioningStart {
                user_id,
                project_id,
                infra_id,
                cluster_type: kind,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::RegistryProvisioningStart { .. } => "registry_provisioning_start",
            AnalyticsEvent::ClusterProvisioningStart { .. } => "cluster_provisioning_start",
        }
    }
}

/// Destination for analytics events
pub trait AnalyticsSink: Send + Sync {
    /// Records `event` without blocking the caller or reporting failure
    fn track(&self, event: AnalyticsEvent);
}

/// Sink that records events in the log and metrics only
#[derive(Debug, Default, Clone)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        counter!("analytics_events_total", "event" => event.name()).increment(1);
        info!(event = event.name(), payload = ?event, "Analytics event");
    }
}

/// Sink that POSTs events as JSON to a collector endpoint
#[derive(Debug, Clone)]
pub struct HttpAnalytics {
    client: Client,
    endpoint: Url,
}

impl HttpAnalytics {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn redacted_target(&self) -> String {
        format!(
            "{}://{}",
            self.endpoint.scheme(),
            self.endpoint.host_str().unwrap_or("unknown")
        )
    }
}

impl HttpAnalytics {
    /// Posts one event to the collector. Non-2xx responses count as failures.
    pub async fn deliver(&self, event: &AnalyticsEvent) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;
        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Why an event did not reach the collector
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("collector unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("collector rejected event with status {0}")]
    Rejected(reqwest::StatusCode),
}

impl AnalyticsSink for HttpAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        counter!("analytics_events_total", "event" => event.name()).increment(1);

        let sink = self.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&event).await {
                counter!("analytics_delivery_failures_total").increment(1);
                warn!(
                    event = event.name(),
                    error = %e,
                    target = %sink.redacted_target(),
                    "Failed to deliver analytics event"
                );
            }
        });
    }
}
