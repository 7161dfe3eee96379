//! k8srun Core
//!
//! Core types and abstractions for running single-shot jobs on Kubernetes.
//!
//! This crate contains:
//! - Domain types: jobs, template selectors, unit identity and phases
//! - Platform traits: the capabilities the runner consumes from the cluster
//! - An in-memory platform that implements those traits without a cluster,
//!   behind the `memory` feature

pub mod domain;
pub mod error;
pub mod platform;

pub use error::{PlatformError, Result};
