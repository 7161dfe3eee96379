//! Pod cleanup
//!
//! The `Reaper` owns the execution for the scope of a run and deletes its
//! pod exactly once. The runner fires it explicitly after streaming and
//! waiting. If the reaper is dropped unfired (the run future was dropped or
//! panicked), `Drop` schedules the deletion on the current tokio runtime.
//!
//! Deletion is best-effort: a failure is logged and never changes the
//! outcome of the run.

use tracing::{debug, info, warn};

use k8srun_core::domain::UnitRef;

use crate::execution::{Execution, ExecutionState};

/// What firing the reaper did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaped {
    /// No pod was launched
    Nothing,
    /// Deletion of the pod was accepted
    Deleted(UnitRef),
    /// Deletion was requested but failed; the pod may be left behind
    Failed(UnitRef),
}

/// Scoped owner of a run's execution
#[derive(Default)]
pub struct Reaper {
    execution: Option<Execution>,
    fired: bool,
}

impl Reaper {
    /// Creates a reaper with nothing to delete yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a launched execution
    ///
    /// Returns the execution so the run can keep working with it.
    pub fn arm(&mut self, execution: Execution) -> &mut Execution {
        self.execution.insert(execution)
    }

    /// Deletes the pod of the armed execution
    ///
    /// A reaper that was never armed does nothing. A pod that is already gone
    /// counts as deleted. If this future is dropped before the request
    /// completes, `Drop` sends it again.
    pub async fn reap(mut self) -> Reaped {
        let Some(execution) = self.execution.as_mut() else {
            self.fired = true;
            debug!("No pod was launched, nothing to delete");
            return Reaped::Nothing;
        };

        let unit = execution.unit().clone();
        let deleted = execution.runtime().delete_unit(&unit).await;
        execution.advance(ExecutionState::Deleted);
        self.fired = true;

        match deleted {
            Ok(()) => {
                info!("Deleted pod {:?} in {:?} namespace", unit.name, unit.namespace);
                Reaped::Deleted(unit)
            }
            Err(e) if e.is_not_found() => {
                debug!("Pod {} was already gone", unit);
                Reaped::Deleted(unit)
            }
            Err(e) => {
                warn!("Failed to delete pod {}: {}", unit, e);
                Reaped::Failed(unit)
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if self.fired {
            return;
        }
        let Some(execution) = self.execution.take() else {
            return;
        };

        let unit = execution.unit().clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Run ended before cleanup, deleting pod {} in background", unit);
                let runtime = execution.runtime().clone();
                handle.spawn(async move {
                    match runtime.delete_unit(&unit).await {
                        Ok(()) => info!("Deleted pod {:?} in {:?} namespace", unit.name, unit.namespace),
                        Err(e) if e.is_not_found() => debug!("Pod {} was already gone", unit),
                        Err(e) => warn!("Failed to delete pod {}: {}", unit, e),
                    }
                });
            }
            Err(_) => {
                warn!("No async runtime available, pod {} was not deleted", unit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{Pod, PodStatus};
    use k8srun_core::domain::{Job, TemplateSelector};
    use k8srun_core::platform::memory::{InMemoryPlatform, Operation, pod_template};
    use k8srun_core::platform::{OutputStream, UnitRuntime};

    use crate::launcher::TaskLauncher;
    use crate::resolver::ResolvedTemplate;

    async fn launch(runtime: Arc<dyn UnitRuntime>) -> Execution {
        let job = Job::new("team-a", "deploy", "prod");
        let resolved = ResolvedTemplate {
            template: pod_template("deploy", "default", &TemplateSelector::for_job(&job)),
            namespace: "default".to_string(),
        };
        TaskLauncher::new(runtime)
            .launch(&resolved, &job)
            .await
            .unwrap()
    }

    async fn wait_until_gone(platform: &InMemoryPlatform) {
        for _ in 0..200 {
            if platform.live_units().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Delays every deletion
    struct SlowDelete(Arc<InMemoryPlatform>);

    #[async_trait]
    impl UnitRuntime for SlowDelete {
        async fn create_unit(&self, namespace: &str, pod: &Pod) -> k8srun_core::Result<Pod> {
            self.0.create_unit(namespace, pod).await
        }

        async fn stream_output(&self, unit: &UnitRef) -> k8srun_core::Result<OutputStream> {
            self.0.stream_output(unit).await
        }

        async fn unit_status(&self, unit: &UnitRef) -> k8srun_core::Result<PodStatus> {
            self.0.unit_status(unit).await
        }

        async fn delete_unit(&self, unit: &UnitRef) -> k8srun_core::Result<()> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.delete_unit(unit).await
        }
    }

    #[tokio::test]
    async fn test_unarmed_reaper_does_nothing() {
        assert_eq!(Reaper::new().reap().await, Reaped::Nothing);
    }

    #[tokio::test]
    async fn test_reap_deletes_pod_once() {
        let platform = Arc::new(InMemoryPlatform::new("default"));
        let mut reaper = Reaper::new();
        let unit = reaper.arm(launch(platform.clone()).await).unit().clone();

        assert_eq!(reaper.reap().await, Reaped::Deleted(unit.clone()));
        assert!(platform.live_units().is_empty());
        assert_eq!(platform.deleted_units(), vec![unit]);
        assert_eq!(platform.calls().deletes, 1);
    }

    #[tokio::test]
    async fn test_failed_delete_is_reported_not_raised() {
        let platform = Arc::new(InMemoryPlatform::new("default"));
        platform.fail(Operation::DeleteUnit);
        let mut reaper = Reaper::new();
        let unit = reaper.arm(launch(platform.clone()).await).unit().clone();

        assert_eq!(reaper.reap().await, Reaped::Failed(unit.clone()));
        assert_eq!(platform.live_units(), vec![unit]);
        assert_eq!(platform.calls().deletes, 1);
    }

    #[tokio::test]
    async fn test_pod_already_gone_counts_as_deleted() {
        let platform = Arc::new(InMemoryPlatform::new("default"));
        let mut reaper = Reaper::new();
        let unit = reaper.arm(launch(platform.clone()).await).unit().clone();
        platform.delete_unit(&unit).await.unwrap();

        assert_eq!(reaper.reap().await, Reaped::Deleted(unit));
        assert_eq!(platform.calls().deletes, 2);
    }

    #[tokio::test]
    async fn test_drop_without_reap_deletes_in_background() {
        let platform = Arc::new(InMemoryPlatform::new("default"));
        let mut reaper = Reaper::new();
        reaper.arm(launch(platform.clone()).await);
        drop(reaper);

        wait_until_gone(&platform).await;

        assert!(platform.live_units().is_empty());
        assert_eq!(platform.calls().deletes, 1);
    }

    #[tokio::test]
    async fn test_reap_dropped_mid_delete_is_retried() {
        let platform = Arc::new(InMemoryPlatform::new("default"));
        let mut reaper = Reaper::new();
        reaper.arm(launch(Arc::new(SlowDelete(platform.clone()))).await);

        let interrupted = tokio::time::timeout(Duration::from_millis(1), reaper.reap()).await;
        assert!(interrupted.is_err());

        wait_until_gone(&platform).await;

        assert!(platform.live_units().is_empty());
        assert_eq!(platform.calls().deletes, 1);
    }
}
