//! Application state shared across handlers.

use std::sync::Arc;

use conductor_health::MetricsAggregator;
use conductor_rpc::{AgentDirectory, AgentRpc, ConnectionRegistry, EventHub, RpcConfig};
use conductor_supervisor::{Supervisor, SupervisorConfig};
use conductor_workflow::WorkflowEngine;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Messaging layer (owns the connection registry and descriptor table).
    pub rpc: AgentRpc,
    /// Process supervisor.
    pub supervisor: Arc<Supervisor>,
    /// Workflow engine.
    pub workflows: WorkflowEngine,
    /// Health and metrics.
    pub metrics: MetricsAggregator,
}

impl AppState {
    /// Wires every component around one descriptor table and event hub.
    pub fn new(config: ApiConfig, supervisor: SupervisorConfig, rpc: RpcConfig) -> Self {
        let directory = Arc::new(AgentDirectory::new());
        let events = EventHub::with_capacity(rpc.event_capacity);
        let registry = Arc::new(ConnectionRegistry::new(directory, events));
        let rpc = AgentRpc::new(registry, rpc);

        Self {
            config: Arc::new(config),
            supervisor: Arc::new(Supervisor::new(supervisor, rpc.clone())),
            workflows: WorkflowEngine::new(Arc::new(rpc.clone())),
            metrics: MetricsAggregator::new(rpc.clone()),
            rpc,
        }
    }

    /// Returns the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.rpc.registry()
    }

    /// Returns the observer event hub.
    pub fn events(&self) -> &EventHub {
        self.rpc.registry().events()
    }
}
