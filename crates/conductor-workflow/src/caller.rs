//! Seam between the engine and whatever reaches the agents.

use async_trait::async_trait;
use serde_json::Value;

use conductor_models::Request;
use conductor_rpc::{AgentRpc, RpcError};

/// Runs one action on one agent.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    /// Executes `action` on `agent_id` and returns its result.
    async fn execute(&self, agent_id: &str, action: &str, params: Value) -> Result<Value, RpcError>;
}

#[async_trait]
impl AgentCaller for AgentRpc {
    async fn execute(&self, agent_id: &str, action: &str, params: Value) -> Result<Value, RpcError> {
        self.call(agent_id, Request::execute(action, params)).await
    }
}
