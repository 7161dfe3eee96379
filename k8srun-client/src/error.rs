//! Error types for the Kubernetes binding

use std::fmt::Display;

use k8srun_core::PlatformError;
use thiserror::Error;

/// Result type alias for connection setup
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while connecting to a cluster
#[derive(Debug, Error)]
pub enum ClientError {
    /// Kubeconfig could not be found, read or resolved
    #[error("Invalid cluster configuration: {0}")]
    Config(String),

    /// The client could not be built from a resolved configuration
    #[error("Failed to create Kubernetes client: {0}")]
    Kube(#[from] kube::Error),
}

impl ClientError {
    pub(crate) fn config(err: impl Display) -> Self {
        Self::Config(err.to_string())
    }
}

/// Translates a kube-rs error into the platform's error vocabulary
///
/// `subject` names the object the call was about and ends up in `NotFound`.
pub(crate) fn platform_error(err: kube::Error, subject: impl Display) -> PlatformError {
    match err {
        kube::Error::Api(response) if response.code == 404 => {
            PlatformError::NotFound(format!("{}: {}", subject, response.message))
        }
        kube::Error::Api(response) => PlatformError::api_error(response.code, response.message),
        other => PlatformError::Transport(other.to_string()),
    }
}
