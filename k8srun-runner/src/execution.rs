//! Execution handle
//!
//! An `Execution` binds a job to the pod launched for it. It only exists
//! for the duration of one run and is never shared between runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use k8srun_core::PlatformError;
use k8srun_core::domain::{Job, UnitRef};
use k8srun_core::platform::UnitRuntime;

/// Lifecycle of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionState {
    /// Pod submitted, identity assigned
    Created,
    /// Output being copied
    Streaming,
    /// Exit code known
    Terminal,
    /// Deletion requested
    Deleted,
}

/// One running pod of a job
pub struct Execution {
    job: Job,
    unit: UnitRef,
    primary_container: String,
    runtime: Arc<dyn UnitRuntime>,
    started_at: DateTime<Utc>,
    state: ExecutionState,
}

impl Execution {
    /// Wraps a pod returned by the platform after creation
    ///
    /// Fails when the pod carries no assigned name or namespace.
    pub fn new(job: Job, created: &Pod, runtime: Arc<dyn UnitRuntime>) -> Result<Self, PlatformError> {
        let unit = UnitRef::from_pod(created).ok_or_else(|| {
            PlatformError::InvalidObject("created pod has no name or namespace".to_string())
        })?;

        let primary_container = created
            .spec
            .as_ref()
            .and_then(|spec| spec.containers.first())
            .map(|c| c.name.clone())
            .unwrap_or_default();

        Ok(Self {
            job,
            unit,
            primary_container,
            runtime,
            started_at: Utc::now(),
            state: ExecutionState::Created,
        })
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn unit(&self) -> &UnitRef {
        &self.unit
    }

    /// Name of the first container, the one that received the job's arguments
    pub fn primary_container(&self) -> &str {
        &self.primary_container
    }

    pub fn runtime(&self) -> &Arc<dyn UnitRuntime> {
        &self.runtime
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Time since the pod was created
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// Moves the execution forward; earlier states are never re-entered
    pub(crate) fn advance(&mut self, state: ExecutionState) {
        if state > self.state {
            self.state = state;
        }
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("job", &self.job.name)
            .field("unit", &self.unit)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .finish()
    }
}
