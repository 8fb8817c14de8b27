//! Registry of live agent connections.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use conductor_models::{AgentDescriptor, AgentInfo};

use crate::connection::Connection;
use crate::directory::AgentDirectory;
use crate::error::{Result, RpcError};
use crate::event::{EventHub, OrchestratorEvent};

/// Tracks which agents currently have a live duplex connection.
pub struct ConnectionRegistry {
    /// Shared descriptor table.
    directory: Arc<AgentDirectory>,
    /// Observer notifications.
    events: EventHub,
    /// Live connections keyed by agent id.
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry over a descriptor table.
    pub fn new(directory: Arc<AgentDirectory>, events: EventHub) -> Self {
        Self {
            directory,
            events,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the descriptor table.
    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    /// Returns the observer hub.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Completes a registration handshake.
    ///
    /// Creates or updates the descriptor (status running, connect time),
    /// stores the connection under the agent id and stamps the connection
    /// with that id. A previous connection for the same agent is replaced
    /// and closed.
    pub async fn register(&self, conn: &Connection, info: AgentInfo) -> Result<AgentDescriptor> {
        if info.id.is_empty() {
            return Err(RpcError::Protocol("register without an agent id".into()));
        }
        conn.stamp(&info.id)?;

        let agent_id = info.id.clone();
        let descriptor = self
            .directory
            .upsert(
                &agent_id,
                || AgentDescriptor::from_registration(info.clone()),
                |d| d.merge_registration(info.clone()),
            )
            .await;

        let replaced = {
            let mut connections = self.connections.write().await;
            connections.insert(agent_id.clone(), conn.clone())
        };
        if let Some(old) = replaced {
            if !old.same_channel(conn) {
                warn!(agent_id = %agent_id, "agent re-registered, replacing previous connection");
                old.close();
            }
        }

        info!(agent_id = %agent_id, name = %descriptor.name, "agent registered");
        self.events.emit(OrchestratorEvent::AgentConnected {
            agent: descriptor.clone(),
        });

        Ok(descriptor)
    }

    /// Handles a closed channel.
    ///
    /// If the channel is the agent's current connection, the descriptor is
    /// marked disconnected and the connection is removed. The agent's
    /// process, if any, is left alone. Returns the agent id when the
    /// registry changed.
    pub async fn on_disconnect(&self, conn: &Connection) -> Option<String> {
        conn.close();

        let agent_id = conn.agent_id()?.to_string();

        let removed = {
            let mut connections = self.connections.write().await;
            match connections.get(&agent_id) {
                Some(current) if current.same_channel(conn) => connections.remove(&agent_id),
                _ => None,
            }
        };
        if removed.is_none() {
            debug!(agent_id = %agent_id, "stale connection closed");
            return None;
        }

        if let Some(descriptor) = self
            .directory
            .update(&agent_id, |d| d.mark_disconnected())
            .await
        {
            info!(agent_id = %agent_id, name = %descriptor.name, "agent disconnected");
            self.events.emit(OrchestratorEvent::AgentDisconnected {
                id: descriptor.id,
                name: descriptor.name,
            });
        }

        Some(agent_id)
    }

    /// Gets the live connection for an agent.
    pub async fn get(&self, agent_id: &str) -> Option<Connection> {
        self.connections.read().await.get(agent_id).cloned()
    }

    /// Returns true if the agent has a live connection.
    pub async fn is_connected(&self, agent_id: &str) -> bool {
        self.connections.read().await.contains_key(agent_id)
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns true if no agent is connected.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Snapshot of all live connections, ordered by agent id.
    pub async fn snapshot(&self) -> Vec<(String, Connection)> {
        let connections = self.connections.read().await;
        let mut list: Vec<(String, Connection)> = connections
            .iter()
            .map(|(id, conn)| (id.clone(), conn.clone()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}
