//! Pod launching
//!
//! Derives a pod from a resolved template and submits it. The template's
//! pod metadata and spec are copied as they are; only the identity, the
//! generated name and the first container's arguments change.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{Pod, PodTemplate};
use k8srun_core::domain::Job;
use k8srun_core::platform::UnitRuntime;
use tracing::{debug, info};

use crate::error::RunError;
use crate::execution::Execution;
use crate::resolver::ResolvedTemplate;

/// Builds the pod to submit for `job` from `template`
///
/// Only the first container receives the job's arguments; templates with
/// sidecars must list the parameterized container first.
pub fn derive_pod(template: &PodTemplate, job: &Job) -> Result<Pod, RunError> {
    let template_name = template.metadata.name.as_deref().unwrap_or_default();

    let pod_template = template
        .template
        .as_ref()
        .ok_or_else(|| RunError::malformed(template_name, "has no pod template spec"))?;

    let mut spec = pod_template
        .spec
        .clone()
        .ok_or_else(|| RunError::malformed(template_name, "has no pod spec"))?;

    let primary = spec
        .containers
        .first_mut()
        .ok_or_else(|| RunError::malformed(template_name, "defines no containers"))?;
    primary.args = Some(job.args.clone());

    let mut metadata = pod_template.metadata.clone().unwrap_or_default();
    metadata.name = None;
    metadata.namespace = None;
    metadata.uid = None;
    metadata.resource_version = None;
    metadata.creation_timestamp = None;
    metadata.generate_name = Some(job.generate_name());

    Ok(Pod {
        metadata,
        spec: Some(spec),
        status: None,
    })
}

/// Submits pods through a `UnitRuntime`
pub struct TaskLauncher {
    runtime: Arc<dyn UnitRuntime>,
}

impl TaskLauncher {
    pub fn new(runtime: Arc<dyn UnitRuntime>) -> Self {
        Self { runtime }
    }

    /// Creates one pod for `job` in the template's namespace
    ///
    /// Creation is not retried: a rejected pod is reported with the
    /// platform's error unchanged. An accepted pod without a name cannot be
    /// addressed afterwards and is reported as a launch failure.
    pub async fn launch(
        &self,
        resolved: &ResolvedTemplate,
        job: &Job,
    ) -> Result<Execution, RunError> {
        let pod = derive_pod(&resolved.template, job)?;

        debug!(
            "Creating pod from template {} in namespace {} with args {:?}",
            resolved.name(),
            resolved.namespace,
            job.args
        );

        let launch_failure = |source| RunError::LaunchFailure {
            namespace: resolved.namespace.clone(),
            source,
        };

        let mut created = self
            .runtime
            .create_unit(&resolved.namespace, &pod)
            .await
            .map_err(launch_failure)?;

        // The pod lives where it was created, whatever the answer omits.
        if created.metadata.namespace.as_deref().is_none_or(str::is_empty) {
            created.metadata.namespace = Some(resolved.namespace.clone());
        }

        let execution = Execution::new(job.clone(), &created, Arc::clone(&self.runtime))
            .map_err(launch_failure)?;

        info!(
            "Created pod {:?} in {:?} namespace",
            execution.unit().name,
            execution.unit().namespace
        );

        Ok(execution)
    }
}
