//! Core domain types
//!
//! This module contains the structures shared by the runner engine and the
//! cluster client. They describe what a job asks for, how it maps onto pod
//! template labels, and how a launched pod is identified and observed.

pub mod job;
pub mod template;
pub mod unit;

pub use job::Job;
pub use template::{InvalidLabelValue, TemplateSelector};
pub use unit::{UnitPhase, UnitRef, UnrecognizedPhase};
