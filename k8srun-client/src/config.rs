//! Cluster connection settings

use std::path::PathBuf;

use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Where to find the cluster
///
/// With neither field set the configuration is inferred: in-cluster service
/// account first, then `$KUBECONFIG` or `~/.kube/config`.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    /// Explicit kubeconfig file
    pub kubeconfig: Option<PathBuf>,
    /// Context to use instead of the kubeconfig's current context
    pub context: Option<String>,
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Resolves the settings into a client configuration
    pub async fn load(&self) -> Result<kube::Config> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path).map_err(ClientError::config)?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(ClientError::config)?
            }
            (None, Some(_)) => kube::Config::from_kubeconfig(&options)
                .await
                .map_err(ClientError::config)?,
            (None, None) => kube::Config::infer().await.map_err(ClientError::config)?,
        };

        debug!(
            "Using cluster {} with default namespace {}",
            config.cluster_url, config.default_namespace
        );
        Ok(config)
    }
}
