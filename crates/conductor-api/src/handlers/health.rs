//! Health and metrics handlers.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde_json::Value;

use conductor_health::HealthReport;

use crate::state::AppState;
use crate::types::ApiResponse;

/// GET /api/health - Orchestrator health and fleet counts.
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthReport>> {
    ApiResponse::ok(state.metrics.global_health().await)
}

/// GET /api/metrics - Status reported by every connected agent.
pub async fn metrics(State(state): State<AppState>) -> Json<ApiResponse<BTreeMap<String, Value>>> {
    ApiResponse::ok(state.metrics.collect_metrics().await)
}
