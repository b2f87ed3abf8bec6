//! # Provisioning
//!
//! Drives a provisioning request from an authorized project scope to a
//! dispatched job: credential lookup, suffix allocation, infra record
//! creation, agent dispatch and failure reconciliation.

use std::fmt::Display;

use tracing::warn;

mod agent;
mod orchestrator;
mod suffix;

pub use agent::{
    AcceptedHandle, AgentError, DatastoreConfig, JobQueueAgent, Operation, ProvisionOpts,
    ProvisionerAgent,
};
pub use orchestrator::{ProvisionError, ProvisionRequest, ProvisionSettings, Provisioner};
pub use suffix::{SUFFIX_BYTES, generate_suffix};

/// Returns `primary` after a compensating step, logging the step's failure.
///
/// Used where a failed operation is followed by cleanup whose own failure must
/// not replace the error reported to the caller.
pub fn keep_primary<P, T, S>(primary: P, compensation: Result<T, S>) -> P
where
    P: Display,
    S: Display,
{
    if let Err(secondary) = compensation {
        warn!(
            error = %primary,
            compensation_error = %secondary,
            "Compensating update failed; reporting original error"
        );
    }
    primary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_primary_ignores_compensation_outcome() {
        assert_eq!(keep_primary("agent down", Ok::<(), &str>(())), "agent down");
        assert_eq!(keep_primary("agent down", Err::<(), _>("db down")), "agent down");
    }
}
