//! Unit (pod) identity and lifecycle phases

use std::fmt;

use k8s_openapi::api::core::v1::{Pod, PodStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a pod created for a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRef {
    pub name: String,
    pub namespace: String,
}

impl UnitRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reads the assigned identity of a pod returned by the platform
    ///
    /// Returns `None` when either the name or the namespace is missing.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone().filter(|n| !n.is_empty())?;
        let namespace = pod.metadata.namespace.clone().filter(|n| !n.is_empty())?;
        Some(Self { name, namespace })
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Pod phase as reported in `status.phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// A `status.phase` string this crate does not know about
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized pod phase {0:?}")]
pub struct UnrecognizedPhase(pub String);

impl UnitPhase {
    /// Phase of a pod status; a status without a phase is still pending
    pub fn from_status(status: &PodStatus) -> Result<Self, UnrecognizedPhase> {
        match status.phase.as_deref() {
            None => Ok(UnitPhase::Pending),
            Some(phase) => phase.parse(),
        }
    }

    /// No further transition happens once a pod is in a terminal phase
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitPhase::Succeeded | UnitPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitPhase::Pending => "Pending",
            UnitPhase::Running => "Running",
            UnitPhase::Succeeded => "Succeeded",
            UnitPhase::Failed => "Failed",
            UnitPhase::Unknown => "Unknown",
        }
    }
}

impl std::str::FromStr for UnitPhase {
    type Err = UnrecognizedPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(UnitPhase::Pending),
            "Running" => Ok(UnitPhase::Running),
            "Succeeded" => Ok(UnitPhase::Succeeded),
            "Failed" => Ok(UnitPhase::Failed),
            "Unknown" => Ok(UnitPhase::Unknown),
            other => Err(UnrecognizedPhase(other.to_string())),
        }
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_phase_round_trips_known_values() {
        for phase in [
            UnitPhase::Pending,
            UnitPhase::Running,
            UnitPhase::Succeeded,
            UnitPhase::Failed,
            UnitPhase::Unknown,
        ] {
            assert_eq!(phase.as_str().parse::<UnitPhase>(), Ok(phase));
        }
    }

    #[test]
    fn test_missing_phase_is_pending() {
        let status = PodStatus::default();
        assert_eq!(UnitPhase::from_status(&status), Ok(UnitPhase::Pending));
    }

    #[test]
    fn test_unrecognized_phase() {
        let status = PodStatus {
            phase: Some("Exploded".to_string()),
            ..Default::default()
        };
        assert_eq!(
            UnitPhase::from_status(&status),
            Err(UnrecognizedPhase("Exploded".to_string()))
        );
    }

    #[test]
    fn test_terminal_phases() {
        assert!(UnitPhase::Succeeded.is_terminal());
        assert!(UnitPhase::Failed.is_terminal());
        assert!(!UnitPhase::Pending.is_terminal());
        assert!(!UnitPhase::Running.is_terminal());
        assert!(!UnitPhase::Unknown.is_terminal());
    }

    #[test]
    fn test_unit_ref_from_pod() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("deploy-x7k2p".to_string()),
                namespace: Some("batch".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let unit = UnitRef::from_pod(&pod).unwrap();
        assert_eq!(unit, UnitRef::new("deploy-x7k2p", "batch"));
        assert_eq!(unit.to_string(), "batch/deploy-x7k2p");

        assert!(UnitRef::from_pod(&Pod::default()).is_none());
    }
}
