//! Handlers that talk to connected agents.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use conductor_models::{AgentCommand, Reply, Request};

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ApiResponse, ExecuteRequest};

/// PUT /api/agents/:id/config - Apply configuration to a connected agent.
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let Json(config) = payload?;
    let result = state
        .rpc
        .call(&id, Request::command(AgentCommand::Config { config }))
        .await?;
    Ok(ApiResponse::ok(result))
}

/// POST /api/agents/:id/message - Send a free-form message.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let Json(body) = payload?;
    let result = state.rpc.call(&id, Request::message(body)).await?;
    Ok(ApiResponse::ok(result))
}

/// POST /api/agents/:id/execute - Run an action on an agent.
pub async fn execute_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let Json(req) = payload?;
    let result = state
        .rpc
        .call(&id, Request::execute(req.action, req.params))
        .await?;
    Ok(ApiResponse::ok(result))
}

/// POST /api/broadcast - Message every connected agent.
pub async fn broadcast(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<BTreeMap<String, Reply>>>> {
    let Json(body) = payload?;
    let results = state.rpc.broadcast(body).await;
    Ok(ApiResponse::ok(results))
}
