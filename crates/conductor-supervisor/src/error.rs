//! Error types for the supervisor crate.

use thiserror::Error;

/// Errors that can occur while supervising agent processes.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No descriptor (and no process) for the agent.
    #[error("agent not found: {0}")]
    NotFound(String),

    /// The agent already has a live process.
    #[error("agent {0} is already running")]
    AlreadyRunning(String),

    /// The agent has no live process.
    #[error("agent {0} is not running")]
    NotRunning(String),

    /// The process could not be spawned.
    #[error("failed to spawn agent {agent_id}: {reason}")]
    Spawn {
        /// Agent id.
        agent_id: String,
        /// Underlying failure.
        reason: String,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Messaging error.
    #[error("rpc error: {0}")]
    Rpc(#[from] conductor_rpc::RpcError),
}

/// Result type for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;
