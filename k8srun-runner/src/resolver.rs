//! Template resolution
//!
//! Finds the one pod template whose prefix, config and instance labels
//! match the job. Zero or several matches are errors; there is no
//! tie-break.

use std::sync::Arc;

use k8s_openapi::api::core::v1::PodTemplate;
use k8srun_core::domain::{Job, TemplateSelector};
use k8srun_core::platform::TemplateCatalog;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RunError;

/// A template together with the namespace pods derived from it go to
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub template: PodTemplate,
    pub namespace: String,
}

impl ResolvedTemplate {
    pub fn name(&self) -> &str {
        self.template.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Looks up templates through a `TemplateCatalog`
pub struct TemplateResolver {
    catalog: Arc<dyn TemplateCatalog>,
}

impl TemplateResolver {
    pub fn new(catalog: Arc<dyn TemplateCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolves the template for `job`
    ///
    /// Searches `job.namespace`, or the catalog's default namespace when the
    /// job carries no override. Issues one list query and nothing else.
    pub async fn resolve(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<ResolvedTemplate, RunError> {
        let namespace = job.namespace_or(self.catalog.default_namespace()).to_string();
        let selector = TemplateSelector::for_job(job);
        selector.validate()?;

        debug!(
            "Looking up pod template {} in namespace {}",
            selector, namespace
        );

        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            listed = self.catalog.list_templates(&namespace, &selector) => listed,
        };
        let mut templates = listed.map_err(|source| RunError::TemplateQuery {
            namespace: namespace.clone(),
            source,
        })?;

        if templates.len() > 1 {
            let candidates = templates
                .iter()
                .map(|t| t.metadata.name.clone().unwrap_or_default())
                .collect();
            return Err(RunError::TemplateAmbiguous {
                namespace,
                selector: selector.to_string(),
                candidates,
            });
        }

        let Some(template) = templates.pop() else {
            return Err(RunError::TemplateNotFound {
                namespace,
                selector: selector.to_string(),
            });
        };

        let namespace = template
            .metadata
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(namespace);

        let resolved = ResolvedTemplate {
            template,
            namespace,
        };
        debug!(
            "Resolved pod template {} in namespace {}",
            resolved.name(),
            resolved.namespace
        );

        Ok(resolved)
    }
}
