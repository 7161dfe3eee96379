//! Completion detection
//!
//! Polls the pod until it reaches `Succeeded` or `Failed` and maps that
//! terminal state to an exit code.

use std::time::Duration;

use k8s_openapi::api::core::v1::PodStatus;
use k8srun_core::PlatformError;
use k8srun_core::domain::UnitPhase;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::RunError;
use crate::execution::{Execution, ExecutionState};
use crate::status::GENERIC_FAILURE;

/// Waits for a pod to terminate
pub struct CompletionWaiter {
    poll_interval: Duration,
}

impl CompletionWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Blocks until the pod of `execution` is terminal and returns its exit code
    pub async fn wait(
        &self,
        execution: &mut Execution,
        cancel: &CancellationToken,
    ) -> Result<i32, RunError> {
        let unit = execution.unit().clone();
        let wait_failure = |source| RunError::WaitFailure {
            unit: unit.clone(),
            source,
        };

        loop {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                status = execution.runtime().unit_status(&unit) => status,
            };
            let status = status.map_err(wait_failure)?;

            let phase = UnitPhase::from_status(&status)
                .map_err(|e| wait_failure(PlatformError::InvalidObject(e.to_string())))?;

            if phase.is_terminal() {
                execution.advance(ExecutionState::Terminal);
                let code = exit_code(phase, &status, execution.primary_container());
                info!(
                    "Pod {} of job {} finished with phase {} and exit code {} after {}s",
                    unit,
                    execution.job().name,
                    phase,
                    code,
                    execution.elapsed().num_seconds()
                );
                return Ok(code);
            }

            debug!("Pod {} is {}", unit, phase);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Exit code for a pod in a terminal phase
///
/// `Succeeded` yields the container's code (0 when none is reported).
/// `Failed` yields the container's non-zero code, or `GENERIC_FAILURE`.
pub fn exit_code(phase: UnitPhase, status: &PodStatus, primary_container: &str) -> i32 {
    let terminated = terminated_exit_code(status, primary_container);

    match phase {
        UnitPhase::Succeeded => terminated.unwrap_or(0),
        _ => terminated
            .filter(|code| *code != 0)
            .unwrap_or(GENERIC_FAILURE),
    }
}

/// Exit code of the primary container, if it has terminated
///
/// Falls back to the first reported container when none carries the
/// primary container's name.
fn terminated_exit_code(status: &PodStatus, primary_container: &str) -> Option<i32> {
    let statuses = status.container_statuses.as_ref()?;

    let container = statuses
        .iter()
        .find(|c| c.name == primary_container)
        .or_else(|| statuses.first())?;

    container
        .state
        .as_ref()?
        .terminated
        .as_ref()
        .map(|t| t.exit_code)
}
