//! Process lifecycle handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use conductor_models::AgentDescriptor;

use crate::error::Result;
use crate::state::AppState;
use crate::types::ApiResponse;

/// POST /api/agents/:id/start - Spawn the agent's process.
pub async fn start_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AgentDescriptor>>> {
    let descriptor = state.supervisor.start(&id).await?;
    Ok(ApiResponse::ok(descriptor))
}

/// POST /api/agents/:id/stop - Stop the agent's process.
pub async fn stop_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AgentDescriptor>>> {
    let descriptor = state.supervisor.stop(&id).await?;
    Ok(ApiResponse::ok(descriptor))
}

/// POST /api/agents/:id/restart - Stop, pause, start.
pub async fn restart_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AgentDescriptor>>> {
    let descriptor = state.supervisor.restart(&id).await?;
    Ok(ApiResponse::ok(descriptor))
}
