//! Request DTOs for the API.

use serde::Deserialize;
use serde_json::Value;

use conductor_models::WorkflowStep;

/// Execute action request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Action name.
    pub action: String,
    /// Action parameters.
    #[serde(default)]
    pub params: Value,
}

/// Workflow execution request.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRequest {
    /// Steps, run in order.
    pub steps: Vec<WorkflowStep>,
}
