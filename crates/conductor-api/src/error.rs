//! API error types.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use conductor_rpc::RpcError;
use conductor_supervisor::SupervisorError;
use conductor_workflow::WorkflowError;

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error type for consistent error responses.
///
/// Messages come from the underlying error and are rendered verbatim in the
/// `error` field of the envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// Conflict with the agent's current lifecycle state.
    #[error("{0}")]
    Conflict(String),

    /// The agent is not reachable.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The agent failed or the channel broke.
    #[error("{0}")]
    BadGateway(String),

    /// The agent did not reply in time.
    #[error("{0}")]
    GatewayTimeout(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string()
        }));
        (status, body).into_response()
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        let message = err.to_string();
        match err {
            RpcError::NotConnected(_) | RpcError::Cancelled(_) => {
                ApiError::ServiceUnavailable(message)
            }
            RpcError::Remote(_) | RpcError::Transport(_) | RpcError::Protocol(_) => {
                ApiError::BadGateway(message)
            }
            RpcError::Timeout { .. } => ApiError::GatewayTimeout(message),
        }
    }
}

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SupervisorError::AlreadyRunning(_) | SupervisorError::NotRunning(_) => {
                ApiError::Conflict(err.to_string())
            }
            SupervisorError::Rpc(rpc) => rpc.into(),
            SupervisorError::Spawn { .. } | SupervisorError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("test".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rpc_error_mapping() {
        let cases = [
            (RpcError::NotConnected("a".into()), StatusCode::SERVICE_UNAVAILABLE),
            (RpcError::Remote("boom".into()), StatusCode::BAD_GATEWAY),
            (RpcError::Transport("closed".into()), StatusCode::BAD_GATEWAY),
            (
                RpcError::Timeout {
                    agent_id: "a".into(),
                    after: Duration::from_secs(30),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_supervisor_error_mapping() {
        assert_eq!(
            ApiError::from(SupervisorError::NotFound("a".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(SupervisorError::AlreadyRunning("a".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(SupervisorError::NotRunning("a".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(SupervisorError::Rpc(RpcError::NotConnected("a".into()))).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_remote_message_is_verbatim() {
        let err = ApiError::from(RpcError::Remote("table orders does not exist".into()));
        assert_eq!(err.to_string(), "table orders does not exist");
    }
}
