//! Workflow handler.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use conductor_models::WorkflowOutcome;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ApiResponse, WorkflowRequest};

/// POST /api/workflow/execute - Run a workflow to completion.
pub async fn execute_workflow(
    State(state): State<AppState>,
    payload: std::result::Result<Json<WorkflowRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<WorkflowOutcome>>> {
    let Json(req) = payload?;
    let outcome = state.workflows.execute(&req.steps).await?;
    Ok(ApiResponse::ok(outcome))
}
