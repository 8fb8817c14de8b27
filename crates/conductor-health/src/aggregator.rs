//! Fleet metrics and orchestrator health.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use conductor_models::{AgentCommand, Request};
use conductor_rpc::AgentRpc;

use crate::report::{AgentCounts, HealthReport, MemoryStats, OrchestratorStats};

/// Aggregates health across the orchestrator and its agents.
#[derive(Clone)]
pub struct MetricsAggregator {
    rpc: AgentRpc,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl MetricsAggregator {
    /// Creates an aggregator. Uptime is counted from now.
    pub fn new(rpc: AgentRpc) -> Self {
        Self {
            rpc,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Asks every connected agent for its status.
    ///
    /// Agents that fail to answer appear as `{"error": message}`.
    pub async fn collect_metrics(&self) -> BTreeMap<String, Value> {
        let outcomes = self
            .rpc
            .fan_out(Request::command(AgentCommand::Status))
            .await;

        outcomes
            .into_iter()
            .map(|(agent_id, outcome)| {
                let metrics = match outcome {
                    Ok(status) => status,
                    Err(e) => {
                        debug!(agent_id = %agent_id, error = %e, "status request failed");
                        json!({ "error": e.to_string() })
                    }
                };
                (agent_id, metrics)
            })
            .collect()
    }

    /// Reports orchestrator process stats and fleet counts.
    pub async fn global_health(&self) -> HealthReport {
        let registry = self.rpc.registry();
        let tallies = registry.directory().count_by_status().await;
        let connections = registry.len().await;

        HealthReport {
            orchestrator: OrchestratorStats {
                status: "running".to_string(),
                pid: std::process::id(),
                started_at: self.started_at,
                uptime_seconds: self.started.elapsed().as_secs(),
                memory: own_memory(),
            },
            agents: AgentCounts::from_tallies(&tallies),
            connections,
        }
    }
}

fn own_memory() -> MemoryStats {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            debug!(error = %e, "cannot resolve own pid");
            return MemoryStats::default();
        }
    };

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid)
        .map(|process| MemoryStats {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_models::{
        AgentDescriptor, AgentInfo, AgentStatus, InboundFrame, InstallOptions, OutboundFrame, Reply,
    };
    use conductor_rpc::{AgentDirectory, Connection, ConnectionRegistry, EventHub, RpcConfig};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn make_rpc() -> AgentRpc {
        let registry = ConnectionRegistry::new(Arc::new(AgentDirectory::new()), EventHub::new());
        AgentRpc::new(Arc::new(registry), RpcConfig::default())
    }

    async fn connect(rpc: &AgentRpc, agent_id: &str, reply: Reply) -> Connection {
        let (conn, mut rx) = Connection::new();
        rpc.registry()
            .register(&conn, AgentInfo::new(agent_id))
            .await
            .unwrap();

        let rpc = rpc.clone();
        let agent = conn.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let OutboundFrame::Request { id, .. } = frame {
                    let _ = rpc
                        .handle_inbound(&agent, InboundFrame::reply(id, reply.clone()))
                        .await;
                }
            }
        });
        conn
    }

    #[tokio::test]
    async fn test_collect_metrics_mixes_results_and_errors() {
        let rpc = make_rpc();
        connect(&rpc, "agent-rest", Reply::ok(json!({"requests": 12}))).await;
        connect(&rpc, "agent-mysql", Reply::err("pool exhausted")).await;

        let metrics = MetricsAggregator::new(rpc).collect_metrics().await;

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics["agent-rest"]["requests"], 12);
        assert_eq!(metrics["agent-mysql"]["error"], "pool exhausted");
    }

    #[tokio::test]
    async fn test_collect_metrics_without_agents() {
        let metrics = MetricsAggregator::new(make_rpc()).collect_metrics().await;
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_global_health_counts() {
        let rpc = make_rpc();
        rpc.registry()
            .directory()
            .insert(AgentDescriptor::installed(
                "agent-scheduler",
                PathBuf::from("/tmp/agent-scheduler"),
                &InstallOptions::default(),
            ))
            .await;
        connect(&rpc, "agent-rest", Reply::ok(json!({}))).await;
        let dropped = connect(&rpc, "agent-openai", Reply::ok(json!({}))).await;
        rpc.registry().on_disconnect(&dropped).await;

        let health = MetricsAggregator::new(rpc.clone()).global_health().await;

        assert_eq!(health.orchestrator.status, "running");
        assert_eq!(health.orchestrator.pid, std::process::id());
        assert_eq!(health.agents.total, 3);
        assert_eq!(health.agents.installed, 1);
        assert_eq!(health.agents.running, 1);
        assert_eq!(health.agents.disconnected, 1);
        assert_eq!(health.connections, rpc.registry().len().await);
        assert_eq!(health.connections, 1);
        assert_eq!(
            rpc.registry().directory().get("agent-openai").await.unwrap().status,
            AgentStatus::Disconnected
        );
    }

    #[test]
    fn test_own_memory_is_reported() {
        let memory = own_memory();
        assert!(memory.rss_bytes > 0);
    }
}
