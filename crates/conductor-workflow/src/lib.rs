//! Workflow execution engine for Conductor.
//!
//! A workflow is an ordered list of steps, each running one action on one
//! agent. The engine threads a shared context through the steps and records
//! one result per executed step.
//!
//! ```ignore
//! use conductor_workflow::WorkflowEngine;
//! use conductor_models::WorkflowStep;
//! use std::sync::Arc;
//!
//! let engine = WorkflowEngine::new(Arc::new(rpc));
//! let outcome = engine
//!     .execute(&[
//!         WorkflowStep::new("fetch", "agent-rest", "get").with_output_var("orders"),
//!         WorkflowStep::new("store", "agent-mysql", "insert"),
//!     ])
//!     .await?;
//! ```

pub mod caller;
pub mod engine;
pub mod error;

pub use caller::AgentCaller;
pub use engine::{WorkflowEngine, CONTEXT_PARAM};
pub use error::{Result, WorkflowError};
