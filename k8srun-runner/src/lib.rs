//! k8srun Runner
//!
//! The execution engine: runs one job as one pod and reports its exit code.
//!
//! Architecture:
//! - Resolver: finds the single pod template labelled for the job
//! - Launcher: creates a pod from the template with the job's arguments
//! - Streamer: copies the pod's output to the caller's sink
//! - Waiter: polls the pod until it terminates and extracts the exit code
//! - Reaper: deletes the pod on every way out of a run
//! - Runner: composes the above behind `Runner::run`
//!
//! Platform access is injected through `k8srun_core::platform`, so the same
//! engine drives a real cluster or the in-memory platform used in tests.

pub mod config;
pub mod error;
pub mod execution;
pub mod launcher;
pub mod reaper;
pub mod resolver;
pub mod runner;
pub mod status;
pub mod streamer;
pub mod waiter;

pub use config::RunnerConfig;
pub use error::RunError;
pub use execution::{Execution, ExecutionState};
pub use runner::Runner;
pub use status::ExitStatus;
