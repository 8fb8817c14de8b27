//! Notifications for observing clients.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use conductor_models::AgentDescriptor;

/// Which standard stream a captured output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Events delivered to observers (UI clients).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OrchestratorEvent {
    /// An agent completed the registration handshake.
    AgentConnected {
        /// Descriptor after registration.
        agent: AgentDescriptor,
    },
    /// An agent's channel closed.
    AgentDisconnected {
        /// Agent id.
        id: String,
        /// Agent name.
        name: String,
    },
    /// Domain event relayed from an agent.
    AgentEvent {
        /// Sending agent.
        agent_id: String,
        /// Event body.
        data: Value,
    },
    /// Log entry relayed from an agent.
    AgentLog {
        /// Sending agent.
        agent_id: String,
        /// Log body.
        data: Value,
    },
    /// The supervisor spawned an agent process.
    AgentStarted {
        /// Agent id.
        id: String,
        /// OS process id.
        pid: Option<u32>,
    },
    /// An agent process exited.
    AgentStopped {
        /// Agent id.
        id: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
    },
    /// A line captured from an agent process.
    AgentOutput {
        /// Agent id.
        id: String,
        /// Source stream.
        stream: OutputStream,
        /// The line, without its terminator.
        line: String,
    },
}

impl OrchestratorEvent {
    /// Returns the agent id this event concerns.
    pub fn agent_id(&self) -> &str {
        match self {
            OrchestratorEvent::AgentConnected { agent } => &agent.id,
            OrchestratorEvent::AgentDisconnected { id, .. } => id,
            OrchestratorEvent::AgentEvent { agent_id, .. } => agent_id,
            OrchestratorEvent::AgentLog { agent_id, .. } => agent_id,
            OrchestratorEvent::AgentStarted { id, .. } => id,
            OrchestratorEvent::AgentStopped { id, .. } => id,
            OrchestratorEvent::AgentOutput { id, .. } => id,
        }
    }
}

/// Fan-out of orchestrator events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<OrchestratorEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// Creates a hub with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a hub buffering up to `capacity` events per slow subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emits an event to all current subscribers.
    pub fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape() {
        let event = OrchestratorEvent::AgentLog {
            agent_id: "agent-rest".into(),
            data: json!({"level": "info", "message": "ready"}),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "agent-log");
        assert_eq!(value["agentId"], "agent-rest");
        assert_eq!(value["data"]["message"], "ready");
    }

    #[test]
    fn test_output_event_shape() {
        let event = OrchestratorEvent::AgentOutput {
            id: "a".into(),
            stream: OutputStream::Stderr,
            line: "oops".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["stream"], "stderr");
        assert_eq!(event.agent_id(), "a");
    }

    #[tokio::test]
    async fn test_hub_multiple_subscribers() {
        let hub = EventHub::new();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.emit(OrchestratorEvent::AgentStopped {
            id: "a".into(),
            exit_code: Some(0),
        });

        assert!(matches!(rx1.recv().await.unwrap(), OrchestratorEvent::AgentStopped { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), OrchestratorEvent::AgentStopped { .. }));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let hub = EventHub::with_capacity(0);
        hub.emit(OrchestratorEvent::AgentStarted {
            id: "a".into(),
            pid: None,
        });
    }
}
