//! Pod template lookup

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PodTemplate;
use k8srun_core::domain::TemplateSelector;
use k8srun_core::platform::TemplateCatalog;
use kube::Api;
use kube::api::ListParams;
use tracing::debug;

use crate::KubeCluster;
use crate::error::platform_error;

#[async_trait]
impl TemplateCatalog for KubeCluster {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Lists the templates in `namespace` with a server-side label selector
    async fn list_templates(
        &self,
        namespace: &str,
        selector: &TemplateSelector,
    ) -> k8srun_core::Result<Vec<PodTemplate>> {
        let api: Api<PodTemplate> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&selector.to_string());

        debug!("Listing pod templates in {} matching {}", namespace, selector);

        let list = api
            .list(&params)
            .await
            .map_err(|e| platform_error(e, format!("pod templates in {}", namespace)))?;

        Ok(list.items)
    }
}
