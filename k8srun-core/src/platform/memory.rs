//! In-memory platform
//!
//! Implements `TemplateCatalog` and `UnitRuntime` over plain data so the
//! runner can be exercised without a cluster. Every pod created here follows
//! a scripted life: it stays `Pending` and `Running` for a configurable
//! number of status polls, then terminates with the scripted exit code.
//! Individual operations can be made to fail, and every call is counted.

use std::collections::{HashMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, ContainerState, ContainerStateTerminated, ContainerStateWaiting, ContainerStatus,
    Pod, PodSpec, PodStatus, PodTemplate, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use uuid::Uuid;

use crate::domain::{TemplateSelector, UnitPhase, UnitRef};
use crate::error::{PlatformError, Result};
use crate::platform::{OutputStream, TemplateCatalog, UnitRuntime};

/// Platform operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTemplates,
    CreateUnit,
    StreamOutput,
    UnitStatus,
    DeleteUnit,
}

/// How a scripted pod terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitExit {
    /// Container terminates with this code; 0 means `Succeeded`
    Code(i32),
    /// Pod is `Failed` but reports no container state
    FailedWithoutStatus,
}

/// What happens after the scripted output has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Stream closes normally
    Close,
    /// Stream fails with a connection reset
    Break,
    /// Stream never produces more data and never closes
    Hang,
}

/// Scripted behaviour shared by every pod the platform creates
#[derive(Debug, Clone)]
pub struct UnitScript {
    pub output: Vec<u8>,
    pub exit: UnitExit,
    pub pending_polls: usize,
    pub running_polls: usize,
    pub stream_end: StreamEnd,
    /// Waiting reason reported for the container while the pod is `Pending`
    pub waiting_reason: Option<String>,
}

impl Default for UnitScript {
    fn default() -> Self {
        Self {
            output: Vec::new(),
            exit: UnitExit::Code(0),
            pending_polls: 0,
            running_polls: 0,
            stream_end: StreamEnd::Close,
            waiting_reason: None,
        }
    }
}

/// Number of calls made per operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub lists: usize,
    pub creates: usize,
    pub streams: usize,
    pub status_polls: usize,
    pub deletes: usize,
}

struct FakeUnit {
    pod: Pod,
    polls: usize,
}

#[derive(Default)]
struct State {
    templates: Vec<PodTemplate>,
    units: HashMap<UnitRef, FakeUnit>,
    created: Vec<Pod>,
    deleted: Vec<UnitRef>,
    failing: HashSet<Operation>,
    calls: CallLog,
}

/// In-memory implementation of both platform traits
pub struct InMemoryPlatform {
    default_namespace: String,
    script: UnitScript,
    state: Mutex<State>,
}

impl InMemoryPlatform {
    /// Creates an empty platform whose default namespace is `default_namespace`
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            script: UnitScript::default(),
            state: Mutex::new(State::default()),
        }
    }

    /// Registers a pod template
    pub fn with_template(self, template: PodTemplate) -> Self {
        self.state().templates.push(template);
        self
    }

    /// Replaces the script followed by pods created from now on
    pub fn with_script(mut self, script: UnitScript) -> Self {
        self.script = script;
        self
    }

    /// Makes every later call of `op` fail with a 500 API error
    pub fn fail(&self, op: Operation) {
        self.state().failing.insert(op);
    }

    /// Undoes `fail`
    pub fn recover(&self, op: Operation) {
        self.state().failing.remove(&op);
    }

    /// Calls made so far
    pub fn calls(&self) -> CallLog {
        self.state().calls.clone()
    }

    /// Every pod accepted by `create_unit`, in creation order
    pub fn created_units(&self) -> Vec<Pod> {
        self.state().created.clone()
    }

    /// Pods that exist right now
    pub fn live_units(&self) -> Vec<UnitRef> {
        self.state().units.keys().cloned().collect()
    }

    /// Pods removed by `delete_unit`, in deletion order
    pub fn deleted_units(&self) -> Vec<UnitRef> {
        self.state().deleted.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &State, op: Operation) -> Result<()> {
        if state.failing.contains(&op) {
            return Err(PlatformError::api_error(
                500,
                format!("injected failure for {:?}", op),
            ));
        }
        Ok(())
    }

    fn status_after(&self, pod: &Pod, polls: usize) -> PodStatus {
        let phase = if polls <= self.script.pending_polls {
            UnitPhase::Pending
        } else if polls <= self.script.pending_polls + self.script.running_polls {
            UnitPhase::Running
        } else {
            match self.script.exit {
                UnitExit::Code(0) => UnitPhase::Succeeded,
                _ => UnitPhase::Failed,
            }
        };

        let container_statuses = match (phase, self.script.exit) {
            (UnitPhase::Succeeded | UnitPhase::Failed, UnitExit::Code(code)) => {
                Some(vec![terminated_status(primary_container(pod), code)])
            }
            (UnitPhase::Pending, _) => self
                .script
                .waiting_reason
                .as_ref()
                .map(|reason| vec![waiting_status(primary_container(pod), reason)]),
            _ => None,
        };

        PodStatus {
            phase: Some(phase.as_str().to_string()),
            container_statuses,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TemplateCatalog for InMemoryPlatform {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn list_templates(
        &self,
        namespace: &str,
        selector: &TemplateSelector,
    ) -> Result<Vec<PodTemplate>> {
        let mut state = self.state();
        state.calls.lists += 1;
        Self::check(&state, Operation::ListTemplates)?;

        Ok(state
            .templates
            .iter()
            .filter(|t| t.metadata.namespace.as_deref() == Some(namespace))
            .filter(|t| selector.matches(t.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitRuntime for InMemoryPlatform {
    async fn create_unit(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let mut state = self.state();
        state.calls.creates += 1;
        Self::check(&state, Operation::CreateUnit)?;

        if pod.spec.as_ref().is_none_or(|spec| spec.containers.is_empty()) {
            return Err(PlatformError::api_error(
                422,
                "spec.containers: Required value",
            ));
        }

        let name = match (&pod.metadata.name, &pod.metadata.generate_name) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(prefix)) if !prefix.is_empty() => {
                let suffix = Uuid::new_v4().simple().to_string();
                format!("{}{}", prefix, &suffix[..5])
            }
            _ => {
                return Err(PlatformError::api_error(
                    422,
                    "metadata.name: Required value: name or generateName is required",
                ));
            }
        };

        let unit = UnitRef::new(name, namespace);
        if state.units.contains_key(&unit) {
            return Err(PlatformError::api_error(
                409,
                format!("pods \"{}\" already exists", unit.name),
            ));
        }

        let mut created = pod.clone();
        created.metadata.name = Some(unit.name.clone());
        created.metadata.namespace = Some(unit.namespace.clone());
        created.metadata.uid = Some(Uuid::new_v4().to_string());
        created.status = Some(PodStatus {
            phase: Some(UnitPhase::Pending.as_str().to_string()),
            ..Default::default()
        });

        state.created.push(created.clone());
        state.units.insert(
            unit,
            FakeUnit {
                pod: created.clone(),
                polls: 0,
            },
        );

        Ok(created)
    }

    async fn stream_output(&self, unit: &UnitRef) -> Result<OutputStream> {
        let mut state = self.state();
        state.calls.streams += 1;
        Self::check(&state, Operation::StreamOutput)?;

        if !state.units.contains_key(unit) {
            return Err(PlatformError::NotFound(format!("pod {}", unit)));
        }

        let output = io::Cursor::new(self.script.output.clone());
        let stream: OutputStream = match self.script.stream_end {
            StreamEnd::Close => Box::pin(output),
            StreamEnd::Break => Box::pin(output.chain(StreamTail { broken: true })),
            StreamEnd::Hang => Box::pin(output.chain(StreamTail { broken: false })),
        };
        Ok(stream)
    }

    async fn unit_status(&self, unit: &UnitRef) -> Result<PodStatus> {
        let mut state = self.state();
        state.calls.status_polls += 1;
        Self::check(&state, Operation::UnitStatus)?;

        let fake = state
            .units
            .get_mut(unit)
            .ok_or_else(|| PlatformError::NotFound(format!("pod {}", unit)))?;
        fake.polls += 1;

        let polls = fake.polls;
        let status = self.status_after(&fake.pod, polls);
        fake.pod.status = Some(status.clone());
        Ok(status)
    }

    async fn delete_unit(&self, unit: &UnitRef) -> Result<()> {
        let mut state = self.state();
        state.calls.deletes += 1;
        Self::check(&state, Operation::DeleteUnit)?;

        if state.units.remove(unit).is_none() {
            return Err(PlatformError::NotFound(format!("pod {}", unit)));
        }
        state.deleted.push(unit.clone());
        Ok(())
    }
}

/// Tail of a scripted stream: either an error or a stream that never ends
struct StreamTail {
    broken: bool,
}

impl AsyncRead for StreamTail {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.broken {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "log stream reset by peer",
            )))
        } else {
            Poll::Pending
        }
    }
}

fn primary_container(pod: &Pod) -> String {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.containers.first())
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn terminated_status(container: String, exit_code: i32) -> ContainerStatus {
    ContainerStatus {
        name: container,
        state: Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                reason: Some(if exit_code == 0 { "Completed" } else { "Error" }.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn waiting_status(container: String, reason: &str) -> ContainerStatus {
    ContainerStatus {
        name: container,
        state: Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                message: Some(format!("scripted {}", reason)),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds a single-container pod template carrying the labels of `selector`
pub fn pod_template(name: &str, namespace: &str, selector: &TemplateSelector) -> PodTemplate {
    PodTemplate {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(selector.to_labels()),
            ..Default::default()
        },
        template: Some(PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "main".to_string(),
                    image: Some("busybox:1.36".to_string()),
                    command: Some(vec!["sh".to_string(), "-c".to_string()]),
                    args: Some(vec!["echo template default".to_string()]),
                    ..Default::default()
                }],
                restart_policy: Some("Never".to_string()),
                ..Default::default()
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Job;

    fn selector() -> TemplateSelector {
        TemplateSelector::for_job(&Job::new("team-a", "deploy", "prod"))
    }

    fn pod(generate_name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                generate_name: Some(generate_name.to_string()),
                ..Default::default()
            },
            spec: pod_template("t", "default", &selector()).template.unwrap().spec,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace_and_labels() {
        let other = TemplateSelector {
            config: "staging".to_string(),
            ..selector()
        };
        let platform = InMemoryPlatform::new("default")
            .with_template(pod_template("a", "default", &selector()))
            .with_template(pod_template("b", "other", &selector()))
            .with_template(pod_template("c", "default", &other));

        let found = platform.list_templates("default", &selector()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("a"));
        assert_eq!(platform.calls().lists, 1);
    }

    #[tokio::test]
    async fn test_create_assigns_generated_name() {
        let platform = InMemoryPlatform::new("default");

        let created = platform.create_unit("batch", &pod("deploy-")).await.unwrap();
        let unit = UnitRef::from_pod(&created).unwrap();

        assert!(unit.name.starts_with("deploy-"));
        assert_eq!(unit.name.len(), "deploy-".len() + 5);
        assert_eq!(unit.namespace, "batch");
        assert_eq!(platform.live_units(), vec![unit]);
    }

    #[tokio::test]
    async fn test_create_rejects_pod_without_containers() {
        let platform = InMemoryPlatform::new("default");
        let mut bad = pod("deploy-");
        bad.spec.as_mut().unwrap().containers.clear();

        let err = platform.create_unit("default", &bad).await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 422, .. }));
        assert!(platform.live_units().is_empty());
    }

    #[tokio::test]
    async fn test_status_follows_script() {
        let platform = InMemoryPlatform::new("default").with_script(UnitScript {
            exit: UnitExit::Code(3),
            pending_polls: 1,
            running_polls: 1,
            ..Default::default()
        });
        let created = platform.create_unit("default", &pod("x-")).await.unwrap();
        let unit = UnitRef::from_pod(&created).unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let status = platform.unit_status(&unit).await.unwrap();
            seen.push(UnitPhase::from_status(&status).unwrap());
        }
        assert_eq!(
            seen,
            vec![UnitPhase::Pending, UnitPhase::Running, UnitPhase::Failed]
        );

        let status = platform.unit_status(&unit).await.unwrap();
        let terminated = status.container_statuses.unwrap()[0]
            .state
            .clone()
            .unwrap()
            .terminated
            .unwrap();
        assert_eq!(terminated.exit_code, 3);
    }

    #[tokio::test]
    async fn test_stream_returns_scripted_output() {
        let platform = InMemoryPlatform::new("default").with_script(UnitScript {
            output: b"hello\n".to_vec(),
            ..Default::default()
        });
        let created = platform.create_unit("default", &pod("x-")).await.unwrap();
        let unit = UnitRef::from_pod(&created).unwrap();

        let mut stream = platform.stream_output(&unit).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[tokio::test]
    async fn test_broken_stream_errors_after_output() {
        let platform = InMemoryPlatform::new("default").with_script(UnitScript {
            output: b"partial".to_vec(),
            stream_end: StreamEnd::Break,
            ..Default::default()
        });
        let created = platform.create_unit("default", &pod("x-")).await.unwrap();
        let unit = UnitRef::from_pod(&created).unwrap();

        let mut stream = platform.stream_output(&unit).await.unwrap();
        let mut out = Vec::new();
        let err = stream.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let platform = InMemoryPlatform::new("default");
        platform.fail(Operation::CreateUnit);
        assert!(platform.create_unit("default", &pod("x-")).await.is_err());

        platform.recover(Operation::CreateUnit);
        assert!(platform.create_unit("default", &pod("x-")).await.is_ok());
        assert_eq!(platform.calls().creates, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_unit_once() {
        let platform = InMemoryPlatform::new("default");
        let created = platform.create_unit("default", &pod("x-")).await.unwrap();
        let unit = UnitRef::from_pod(&created).unwrap();

        platform.delete_unit(&unit).await.unwrap();
        assert!(platform.live_units().is_empty());
        assert_eq!(platform.deleted_units(), vec![unit.clone()]);

        let err = platform.delete_unit(&unit).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
