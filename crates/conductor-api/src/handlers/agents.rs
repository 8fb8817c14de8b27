//! Agent descriptor handlers.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};

use conductor_models::{AgentDescriptor, InstallOptions};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{ApiResponse, MessageResponse};

/// GET /api/agents - List all agents.
pub async fn list_agents(State(state): State<AppState>) -> Json<ApiResponse<Vec<AgentDescriptor>>> {
    ApiResponse::ok(state.supervisor.list().await)
}

/// GET /api/agents/:id - Get one agent.
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AgentDescriptor>>> {
    let descriptor = state.supervisor.get(&id).await?;
    Ok(ApiResponse::ok(descriptor))
}

/// POST /api/agents/:id/install - Install an agent. The body is optional.
pub async fn install_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<AgentDescriptor>>> {
    let options = parse_install_options(&body)?;
    let descriptor = state.supervisor.install(&id, options).await?;
    Ok(ApiResponse::ok(descriptor))
}

/// DELETE /api/agents/:id - Uninstall an agent.
pub async fn uninstall_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>> {
    state.supervisor.uninstall(&id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("agent uninstalled")))
}

fn parse_install_options(body: &[u8]) -> Result<InstallOptions> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(InstallOptions::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid install options: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_uses_defaults() {
        let options = parse_install_options(b"").unwrap();
        assert!(options.name.is_none());
        assert!(options.command.is_none());

        assert!(parse_install_options(b"  \n").is_ok());
    }

    #[test]
    fn test_install_options_parsed() {
        let options = parse_install_options(br#"{"name":"REST","version":"2.0.0"}"#).unwrap();
        assert_eq!(options.name.as_deref(), Some("REST"));
        assert_eq!(options.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_malformed_body_rejected() {
        let err = parse_install_options(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
