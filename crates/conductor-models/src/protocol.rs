//! Duplex channel protocol between the orchestrator and its agents.
//!
//! Every frame is a JSON object tagged by `type`. Requests carry a
//! correlation id that the agent echoes back in its `reply` frame.
//!
//! ```text
//! orchestrator -> agent   {"type":"request","id":"…","request":{"verb":"execute","action":"query","params":{}}}
//! agent -> orchestrator   {"type":"reply","id":"…","success":true,"result":{}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::agent::AgentInfo;

/// Message used when an agent fails without saying why.
const UNSPECIFIED_FAILURE: &str = "agent reported failure without an error message";

/// Command understood by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum AgentCommand {
    /// Report status and metrics.
    Status,
    /// Apply configuration and return the effective config.
    Config {
        /// New configuration values.
        config: Value,
    },
    /// Restart internally.
    Restart,
}

/// A request to an agent, one variant per verb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "lowercase")]
pub enum Request {
    /// Free-form message.
    Message {
        /// Message body.
        payload: Value,
    },
    /// Run a domain action.
    Execute {
        /// Action name.
        action: String,
        /// Action parameters.
        #[serde(default)]
        params: Value,
    },
    /// Control command.
    Command {
        /// The command.
        command: AgentCommand,
    },
}

impl Request {
    /// Creates a `message` request.
    pub fn message(payload: Value) -> Self {
        Request::Message { payload }
    }

    /// Creates an `execute` request.
    pub fn execute(action: impl Into<String>, params: Value) -> Self {
        Request::Execute {
            action: action.into(),
            params,
        }
    }

    /// Creates a `command` request.
    pub fn command(command: AgentCommand) -> Self {
        Request::Command { command }
    }

    /// Returns the verb name.
    pub fn verb(&self) -> &'static str {
        match self {
            Request::Message { .. } => "message",
            Request::Execute { .. } => "execute",
            Request::Command { .. } => "command",
        }
    }
}

/// Reply to a request: `{success, result}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Whether the request succeeded.
    pub success: bool,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    /// Creates a successful reply.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failed reply.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Converts into the result value or the error message.
    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self
                .error
                .unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string()))
        }
    }
}

impl From<Result<Value, String>> for Reply {
    fn from(result: Result<Value, String>) -> Self {
        match result {
            Ok(value) => Reply::ok(value),
            Err(error) => Reply::err(error),
        }
    }
}

/// Frames sent by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundFrame {
    /// Registration handshake.
    Register {
        /// Identity and metadata.
        agent: AgentInfo,
    },
    /// Reply to a correlated request.
    Reply {
        /// Correlation id of the request.
        id: Uuid,
        /// Whether the request succeeded.
        success: bool,
        /// Result on success.
        #[serde(default)]
        result: Option<Value>,
        /// Error message on failure.
        #[serde(default)]
        error: Option<String>,
    },
    /// Domain event relayed to observers.
    AgentEvent {
        /// Event body.
        data: Value,
    },
    /// Log entry relayed to observers.
    AgentLog {
        /// Log body.
        data: Value,
    },
    /// Message addressed to another agent.
    AgentMessage {
        /// Correlation id for the routed reply, if the sender wants one.
        #[serde(default)]
        id: Option<Uuid>,
        /// Sending agent id.
        from: String,
        /// Target agent id.
        to: String,
        /// Message body.
        message: Value,
    },
}

impl InboundFrame {
    /// Builds a reply frame.
    pub fn reply(id: Uuid, reply: Reply) -> Self {
        InboundFrame::Reply {
            id,
            success: reply.success,
            result: reply.result,
            error: reply.error,
        }
    }
}

/// Frames sent to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundFrame {
    /// Correlated request.
    Request {
        /// Correlation id.
        id: Uuid,
        /// The request.
        request: Request,
    },
    /// Graceful stop notification. No reply expected.
    Shutdown,
    /// Answer to an `agent-message` the agent sent.
    Reply {
        /// Correlation id from the agent's message.
        id: Uuid,
        /// Whether the routed message succeeded.
        success: bool,
        /// Result on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error message on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl OutboundFrame {
    /// Builds a reply frame.
    pub fn reply(id: Uuid, reply: Reply) -> Self {
        OutboundFrame::Reply {
            id,
            success: reply.success,
            result: reply.result,
            error: reply.error,
        }
    }
}
