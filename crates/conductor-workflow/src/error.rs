//! Error types for the workflow crate.

use thiserror::Error;

/// Errors rejected before a workflow runs.
///
/// Step failures are never errors; they become failed step results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A step is missing a required field.
    #[error("step {index} ({name}) has an empty {field}")]
    InvalidStep {
        /// Position of the step.
        index: usize,
        /// Step name.
        name: String,
        /// Offending field.
        field: &'static str,
    },
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
