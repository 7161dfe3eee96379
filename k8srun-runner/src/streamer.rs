//! Output streaming
//!
//! Copies the pod's output to the caller's sink, byte for byte, until the
//! platform closes the stream. Closure of the stream says nothing about the
//! exit code; that is the waiter's job.

use std::time::Duration;

use k8s_openapi::api::core::v1::PodStatus;
use k8srun_core::PlatformError;
use k8srun_core::domain::UnitPhase;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RunError;
use crate::execution::{Execution, ExecutionState};

/// Waiting reasons after which a container will not start on its own
const STUCK_REASONS: &[&str] = &[
    "ErrImagePull",
    "ImagePullBackOff",
    "ErrImageNeverPull",
    "InvalidImageName",
    "CreateContainerConfigError",
    "CreateContainerError",
];

/// Copies pod output to a sink
pub struct LogStreamer {
    poll_interval: Duration,
    start_timeout: Duration,
}

impl LogStreamer {
    pub fn new(poll_interval: Duration, start_timeout: Duration) -> Self {
        Self {
            poll_interval,
            start_timeout,
        }
    }

    /// Streams the output of `execution` into `sink`
    ///
    /// Waits for the pod to leave `Pending` first, since the log of a
    /// container that has not started cannot be opened. A container stuck
    /// on its image or configuration, or a pod still pending after the start
    /// timeout, fails the stream. Returns the number of bytes copied. A torn
    /// stream is reported, never retried.
    pub async fn stream<W>(
        &self,
        execution: &mut Execution,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<u64, RunError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        execution.advance(ExecutionState::Streaming);
        let unit = execution.unit().clone();
        let stream_failure = |source| RunError::StreamFailure {
            unit: unit.clone(),
            source,
        };

        self.await_started(execution, cancel)
            .await?
            .map_err(stream_failure)?;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            opened = execution.runtime().stream_output(&unit) => opened,
        };
        let mut output = opened.map_err(stream_failure)?;

        debug!("Streaming output of pod {}", unit);

        let copied = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            copied = tokio::io::copy(&mut output, sink) => copied,
        };
        let copied = copied.map_err(|e| stream_failure(PlatformError::Io(e)))?;

        sink.flush()
            .await
            .map_err(|e| stream_failure(PlatformError::Io(e)))?;

        debug!("Output stream of pod {} closed after {} bytes", unit, copied);
        Ok(copied)
    }

    /// Polls until the pod is past `Pending`
    ///
    /// The outer error is cancellation, the inner one a platform failure.
    async fn await_started(
        &self,
        execution: &Execution,
        cancel: &CancellationToken,
    ) -> Result<Result<UnitPhase, PlatformError>, RunError> {
        let deadline = Instant::now() + self.start_timeout;

        loop {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                status = execution.runtime().unit_status(execution.unit()) => status,
            };
            let status = match status {
                Ok(status) => status,
                Err(e) => return Ok(Err(e)),
            };

            let phase = match UnitPhase::from_status(&status) {
                Ok(phase) => phase,
                Err(e) => return Ok(Err(PlatformError::InvalidObject(e.to_string()))),
            };
            if phase != UnitPhase::Pending {
                return Ok(Ok(phase));
            }

            if let Some(reason) = stuck_reason(&status) {
                return Ok(Err(PlatformError::NotStarted(reason)));
            }
            if Instant::now() >= deadline {
                return Ok(Err(PlatformError::NotStarted(format!(
                    "pod still pending after {}s",
                    self.start_timeout.as_secs_f64()
                ))));
            }

            debug!("Pod {} is pending", execution.unit());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Describes the first container waiting for a reason it cannot recover from
fn stuck_reason(status: &PodStatus) -> Option<String> {
    status
        .container_statuses
        .iter()
        .flatten()
        .find_map(|container| {
            let waiting = container.state.as_ref()?.waiting.as_ref()?;
            let reason = waiting.reason.as_deref()?;
            if !STUCK_REASONS.contains(&reason) {
                return None;
            }
            Some(match waiting.message.as_deref() {
                Some(message) => format!("container {} is {}: {}", container.name, reason, message),
                None => format!("container {} is {}", container.name, reason),
            })
        })
}
