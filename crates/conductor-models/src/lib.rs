//! Core data models for Conductor.
//!
//! This crate provides the fundamental data types shared by every Conductor
//! crate: agent descriptors, workflow steps and results, the agent catalog,
//! and the JSON frames exchanged with agents over the duplex channel.

pub mod agent;
pub mod catalog;
pub mod protocol;
pub mod workflow;

// Re-export main types
pub use agent::{AgentDescriptor, AgentInfo, AgentStatus, InstallOptions, LaunchSpec};
pub use catalog::{builtin_catalog, CatalogEntry};
pub use protocol::{AgentCommand, InboundFrame, OutboundFrame, Reply, Request};
pub use workflow::{StepResult, WorkflowContext, WorkflowOutcome, WorkflowStep};
