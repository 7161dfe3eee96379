//! Platform capabilities consumed by the runner
//!
//! The runner never talks to the cluster directly. It is handed a
//! `TemplateCatalog` to find pod templates and a `UnitRuntime` to create,
//! observe and delete pods. Both are trait-based so the engine can run
//! against a real cluster or against `memory::InMemoryPlatform`.

#[cfg(any(test, feature = "memory"))]
pub mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodStatus, PodTemplate};
use tokio::io::AsyncRead;

use crate::domain::{TemplateSelector, UnitRef};
use crate::error::Result;

/// Live output of a pod, closed by the platform once the container exits
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// Read-only access to registered pod templates
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    /// Namespace used when a job carries no override
    fn default_namespace(&self) -> &str;

    /// Lists the templates in `namespace` carrying every label of `selector`
    async fn list_templates(
        &self,
        namespace: &str,
        selector: &TemplateSelector,
    ) -> Result<Vec<PodTemplate>>;
}

/// Pod lifecycle operations
#[async_trait]
pub trait UnitRuntime: Send + Sync {
    /// Submits a pod and returns it with its assigned identity
    async fn create_unit(&self, namespace: &str, pod: &Pod) -> Result<Pod>;

    /// Opens the followed output stream of the pod
    async fn stream_output(&self, unit: &UnitRef) -> Result<OutputStream>;

    /// Reads the current status of the pod
    async fn unit_status(&self, unit: &UnitRef) -> Result<PodStatus>;

    /// Requests deletion of the pod
    async fn delete_unit(&self, unit: &UnitRef) -> Result<()>;
}
