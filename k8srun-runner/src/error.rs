//! Error types for a run
//!
//! Every variant is a failure of the machinery around the job, never of the
//! job itself: a pod that runs and exits non-zero is reported through its
//! exit code, not through `RunError`.

use k8srun_core::PlatformError;
use k8srun_core::domain::{InvalidLabelValue, UnitRef};
use thiserror::Error;

/// Errors that abort a run with exit code 128
#[derive(Debug, Error)]
pub enum RunError {
    /// A selector value cannot be expressed as a label value
    #[error("invalid template selector: {0}")]
    InvalidSelector(#[from] InvalidLabelValue),

    /// No template carries the job's labels
    #[error("unable to find the pod template {selector} in namespace {namespace:?}")]
    TemplateNotFound { namespace: String, selector: String },

    /// Several templates carry the job's labels
    #[error(
        "more than one pod template is defined for {selector} in namespace {namespace:?}: {}",
        .candidates.join(", ")
    )]
    TemplateAmbiguous {
        namespace: String,
        selector: String,
        candidates: Vec<String>,
    },

    /// Listing templates failed
    #[error("failed to list pod templates in namespace {namespace:?}")]
    TemplateQuery {
        namespace: String,
        #[source]
        source: PlatformError,
    },

    /// Template cannot be turned into a pod
    #[error("pod template {template:?} is malformed: {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// The platform refused to create the pod
    #[error("failed to create pod in namespace {namespace:?}")]
    LaunchFailure {
        namespace: String,
        #[source]
        source: PlatformError,
    },

    /// The output stream could not be opened or broke while copying
    #[error("failed to stream output of pod {unit}")]
    StreamFailure {
        unit: UnitRef,
        #[source]
        source: PlatformError,
    },

    /// The terminal state of the pod could not be determined
    #[error("failed to determine the final state of pod {unit}")]
    WaitFailure {
        unit: UnitRef,
        #[source]
        source: PlatformError,
    },

    /// The caller cancelled the run
    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    pub(crate) fn malformed(template: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = RunError::TemplateAmbiguous {
            namespace: "default".to_string(),
            selector: "k=v".to_string(),
            candidates: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "more than one pod template is defined for k=v in namespace \"default\": a, b"
        );
    }

    #[test]
    fn test_platform_error_is_kept_as_source() {
        let err = RunError::LaunchFailure {
            namespace: "default".to_string(),
            source: PlatformError::api_error(403, "exceeded quota"),
        };
        let source = err.source().unwrap().to_string();
        assert_eq!(source, "API error (status 403): exceeded quota");
    }
}
