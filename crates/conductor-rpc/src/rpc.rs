//! RPC messaging layer built on the connection registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use conductor_models::{InboundFrame, OutboundFrame, Reply, Request};

use crate::config::RpcConfig;
use crate::connection::Connection;
use crate::error::{Result, RpcError};
use crate::event::OrchestratorEvent;
use crate::registry::ConnectionRegistry;

/// Fire-and-forget notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Ask the agent to stop gracefully.
    Shutdown,
}

impl From<Notification> for OutboundFrame {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::Shutdown => OutboundFrame::Shutdown,
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline for the reply. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Token that aborts the call when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    /// Options with the given deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    /// Attaches a cancellation token.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Unicast, notification and broadcast operations against connected agents.
#[derive(Clone)]
pub struct AgentRpc {
    registry: Arc<ConnectionRegistry>,
    config: RpcConfig,
}

impl AgentRpc {
    /// Creates the RPC layer.
    pub fn new(registry: Arc<ConnectionRegistry>, config: RpcConfig) -> Self {
        Self { registry, config }
    }

    /// Returns the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Default options: the configured deadline, no cancellation.
    pub fn default_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.config.call_timeout,
            cancel: None,
        }
    }

    /// Sends a request to an agent and waits for its correlated reply.
    pub async fn call(&self, agent_id: &str, request: Request) -> Result<Value> {
        self.call_with(agent_id, request, self.default_options()).await
    }

    /// `call` with explicit deadline and cancellation.
    pub async fn call_with(
        &self,
        agent_id: &str,
        request: Request,
        options: CallOptions,
    ) -> Result<Value> {
        let conn = self
            .registry
            .get(agent_id)
            .await
            .ok_or_else(|| RpcError::NotConnected(agent_id.to_string()))?;

        debug!(agent_id = %agent_id, verb = request.verb(), "calling agent");
        let result = conn
            .request(request, options.timeout, options.cancel.as_ref())
            .await;

        if let Err(e) = &result {
            debug!(agent_id = %agent_id, error = %e, "agent call failed");
        }
        result
    }

    /// Sends a notification without waiting for any reply.
    pub async fn notify(&self, agent_id: &str, notification: Notification) -> Result<()> {
        let conn = self
            .registry
            .get(agent_id)
            .await
            .ok_or_else(|| RpcError::NotConnected(agent_id.to_string()))?;
        debug!(agent_id = %agent_id, notification = ?notification, "notifying agent");
        conn.send(notification.into())
    }

    /// Issues `request` to every connected agent concurrently and collects
    /// every outcome. One failure never hides another agent's outcome.
    pub async fn fan_out(&self, request: Request) -> BTreeMap<String, Result<Value>> {
        let targets = self.registry.snapshot().await;
        let timeout = self.config.call_timeout;

        let calls = targets.into_iter().map(|(agent_id, conn)| {
            let request = request.clone();
            async move {
                let outcome = conn.request(request, timeout, None).await;
                (agent_id, outcome)
            }
        });

        join_all(calls).await.into_iter().collect()
    }

    /// Sends `payload` as a `message` to every connected agent.
    pub async fn broadcast(&self, payload: Value) -> BTreeMap<String, Reply> {
        let outcomes = self.fan_out(Request::message(payload)).await;
        info!(agents = outcomes.len(), "broadcast complete");
        outcomes
            .into_iter()
            .map(|(agent_id, outcome)| {
                let reply = match outcome {
                    Ok(result) => Reply::ok(result),
                    Err(e) => Reply::err(e.to_string()),
                };
                (agent_id, reply)
            })
            .collect()
    }

    /// Dispatches a frame received from an agent.
    pub async fn handle_inbound(&self, conn: &Connection, frame: InboundFrame) -> Result<()> {
        match frame {
            InboundFrame::Register { agent } => {
                self.registry.register(conn, agent).await?;
            }
            InboundFrame::Reply {
                id,
                success,
                result,
                error,
            } => {
                conn.resolve(
                    id,
                    Reply {
                        success,
                        result,
                        error,
                    },
                );
            }
            InboundFrame::AgentEvent { data } => {
                let agent_id = registered_id(conn, "agent-event")?;
                self.registry
                    .events()
                    .emit(OrchestratorEvent::AgentEvent { agent_id, data });
            }
            InboundFrame::AgentLog { data } => {
                let agent_id = registered_id(conn, "agent-log")?;
                self.registry
                    .events()
                    .emit(OrchestratorEvent::AgentLog { agent_id, data });
            }
            InboundFrame::AgentMessage {
                id,
                from,
                to,
                message,
            } => {
                let sender_id = registered_id(conn, "agent-message")?;
                if from != sender_id {
                    return Err(RpcError::Protocol(format!(
                        "agent {} sent a message as {}",
                        sender_id, from
                    )));
                }
                // Routed on its own task so the sender's read loop keeps
                // delivering replies while the target works.
                let rpc = self.clone();
                let sender = conn.clone();
                tokio::spawn(async move {
                    rpc.route_message(&sender, id, sender_id, to, message).await;
                });
            }
        }
        Ok(())
    }

    /// Forwards an agent-to-agent message and answers the sender.
    async fn route_message(
        &self,
        sender: &Connection,
        id: Option<Uuid>,
        from: String,
        to: String,
        message: Value,
    ) {
        info!(from = %from, to = %to, "routing agent message");

        let mut payload = Map::new();
        payload.insert("from".to_string(), Value::String(from.clone()));
        match message {
            Value::Object(fields) => payload.extend(fields),
            other => {
                payload.insert("message".to_string(), other);
            }
        }

        let outcome = self.call(&to, Request::message(Value::Object(payload))).await;
        let reply = match outcome {
            Ok(result) => Reply::ok(result),
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "routed message failed");
                Reply::err(e.to_string())
            }
        };

        if let Some(id) = id {
            if let Err(e) = sender.send(OutboundFrame::reply(id, reply)) {
                debug!(from = %from, error = %e, "sender went away before routed reply");
            }
        }
    }
}

fn registered_id(conn: &Connection, frame: &str) -> Result<String> {
    conn.agent_id()
        .map(str::to_string)
        .ok_or_else(|| RpcError::Protocol(format!("{} received before register", frame)))
}
