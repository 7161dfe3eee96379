//! k8srun Kubernetes binding
//!
//! Implements the platform traits of `k8srun_core` on top of kube-rs, so the
//! runner can drive a real cluster.
//!
//! - `TemplateCatalog`: lists `PodTemplate` objects with a label selector
//! - `UnitRuntime`: creates, follows, polls and deletes `Pod` objects
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use k8srun_client::{ClusterConfig, KubeCluster};
//! use k8srun_core::domain::Job;
//! use k8srun_runner::{Runner, RunnerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cluster = Arc::new(KubeCluster::connect(&ClusterConfig::new()).await?);
//!     let runner = Runner::new(cluster.clone(), cluster, &RunnerConfig::default());
//!
//!     let job = Job::new("team-a", "deploy", "prod").with_args(["--dry-run"]);
//!     let status = runner.run(&job, &mut tokio::io::stdout()).await;
//!
//!     std::process::exit(status.code);
//! }
//! ```

pub mod config;
pub mod error;
mod pods;
mod templates;

pub use config::ClusterConfig;
pub use error::{ClientError, Result};

use kube::Client;
use tracing::info;

/// Connection to one Kubernetes cluster
///
/// Cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    /// Namespace of the resolved kube context
    default_namespace: String,
}

impl KubeCluster {
    /// Connects using the given settings
    ///
    /// No request is made here; an unreachable API server surfaces on the
    /// first call.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let config = config.load().await?;
        let cluster_url = config.cluster_url.clone();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config)?;

        info!(
            "Using cluster {} with default namespace {:?}",
            cluster_url, default_namespace
        );

        Ok(Self::with_client(client, default_namespace))
    }

    /// Wraps an already configured client
    pub fn with_client(client: Client, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster")
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}
