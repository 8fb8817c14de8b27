//! Error types for the RPC layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to agents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// No live connection for the agent.
    #[error("agent {0} is not connected")]
    NotConnected(String),

    /// The agent replied with `success: false`.
    #[error("{0}")]
    Remote(String),

    /// The connection closed before a reply arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// No reply within the call deadline.
    #[error("agent {agent_id} did not reply within {}ms", .after.as_millis())]
    Timeout {
        /// Agent that was called.
        agent_id: String,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// The caller cancelled the call.
    #[error("call to agent {0} was cancelled")]
    Cancelled(String),

    /// The agent sent a frame that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
