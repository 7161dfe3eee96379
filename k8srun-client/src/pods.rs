//! Pod lifecycle

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8srun_core::domain::UnitRef;
use k8srun_core::platform::{OutputStream, UnitRuntime};
use kube::Api;
use kube::api::{DeleteParams, LogParams, PostParams};
use tokio_util::compat::FuturesAsyncReadCompatExt;

use crate::KubeCluster;
use crate::error::platform_error;

impl KubeCluster {
    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl UnitRuntime for KubeCluster {
    async fn create_unit(&self, namespace: &str, pod: &Pod) -> k8srun_core::Result<Pod> {
        self.pods(namespace)
            .create(&PostParams::default(), pod)
            .await
            .map_err(|e| platform_error(e, format!("pod in {}", namespace)))
    }

    /// Follows the pod's log until the container exits
    async fn stream_output(&self, unit: &UnitRef) -> k8srun_core::Result<OutputStream> {
        let params = LogParams {
            follow: true,
            ..Default::default()
        };

        let log = self
            .pods(&unit.namespace)
            .log_stream(&unit.name, &params)
            .await
            .map_err(|e| platform_error(e, format!("pod {}", unit)))?;

        Ok(Box::pin(log.compat()))
    }

    async fn unit_status(&self, unit: &UnitRef) -> k8srun_core::Result<PodStatus> {
        let pod = self
            .pods(&unit.namespace)
            .get(&unit.name)
            .await
            .map_err(|e| platform_error(e, format!("pod {}", unit)))?;

        // A freshly created pod may not report a status yet.
        Ok(pod.status.unwrap_or_default())
    }

    async fn delete_unit(&self, unit: &UnitRef) -> k8srun_core::Result<()> {
        self.pods(&unit.namespace)
            .delete(&unit.name, &DeleteParams::default())
            .await
            .map_err(|e| platform_error(e, format!("pod {}", unit)))?;
        Ok(())
    }
}
