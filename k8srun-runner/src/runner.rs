//! Job runner
//!
//! Composes resolution, launch, streaming, waiting and cleanup into a single
//! call. Each run is strictly sequential:
//!
//! 1. Resolve the template and launch the pod. On failure, return 128.
//! 2. Hand the execution to a `Reaper`; from here on every path deletes it.
//! 3. Copy the pod's output. On failure, return 128.
//! 4. Wait for the pod to terminate and return its exit code.
//! 5. Fire the reaper, after streaming and waiting, never during.

use std::sync::Arc;

use k8srun_core::domain::Job;
use k8srun_core::platform::{TemplateCatalog, UnitRuntime};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::RunError;
use crate::execution::Execution;
use crate::launcher::TaskLauncher;
use crate::reaper::Reaper;
use crate::resolver::TemplateResolver;
use crate::status::ExitStatus;
use crate::streamer::LogStreamer;
use crate::waiter::CompletionWaiter;

/// Runs jobs as pods
///
/// A runner holds no per-run state; concurrent runs each own their own
/// execution and pod.
pub struct Runner {
    resolver: TemplateResolver,
    launcher: TaskLauncher,
    streamer: LogStreamer,
    waiter: CompletionWaiter,
}

impl Runner {
    /// Creates a runner over the given platform capabilities
    pub fn new(
        catalog: Arc<dyn TemplateCatalog>,
        runtime: Arc<dyn UnitRuntime>,
        config: &RunnerConfig,
    ) -> Self {
        Self {
            resolver: TemplateResolver::new(catalog),
            launcher: TaskLauncher::new(runtime),
            streamer: LogStreamer::new(config.poll_interval, config.start_timeout),
            waiter: CompletionWaiter::new(config.poll_interval),
        }
    }

    /// Runs `job` to completion, copying its output into `sink`
    pub async fn run<W>(&self, job: &Job, sink: &mut W) -> ExitStatus
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.run_with_cancel(job, sink, &CancellationToken::new())
            .await
    }

    /// Runs `job` to completion unless `cancel` fires first
    ///
    /// A cancelled run returns 128 with `RunError::Cancelled`; its pod is
    /// still deleted.
    pub async fn run_with_cancel<W>(
        &self,
        job: &Job,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> ExitStatus
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut reaper = Reaper::new();
        let result = self.run_scoped(job, sink, cancel, &mut reaper).await;
        reaper.reap().await;

        match &result {
            Ok(code) => debug!("Job {} finished with exit code {}", job.name, code),
            Err(RunError::Cancelled) => warn!("Job {} was cancelled", job.name),
            Err(e) => debug!("Job {} failed: {}", job.name, e),
        }

        ExitStatus::from(result)
    }

    /// Resolves the template for `job` and creates its pod
    pub async fn launch(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<Execution, RunError> {
        let resolved = self.resolver.resolve(job, cancel).await?;
        self.launcher.launch(&resolved, job).await
    }

    async fn run_scoped<W>(
        &self,
        job: &Job,
        sink: &mut W,
        cancel: &CancellationToken,
        reaper: &mut Reaper,
    ) -> Result<i32, RunError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let execution = reaper.arm(self.launch(job, cancel).await?);

        // Creation runs to completion so the pod is known to the reaper.
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        self.streamer.stream(execution, sink, cancel).await?;
        self.waiter.wait(execution, cancel).await
    }
}
