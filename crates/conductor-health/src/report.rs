//! Health report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conductor_models::AgentStatus;

/// Orchestrator health plus fleet counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// The orchestrator's own process.
    pub orchestrator: OrchestratorStats,
    /// Descriptor counts by status.
    pub agents: AgentCounts,
    /// Live duplex connections.
    pub connections: usize,
}

/// Stats of the orchestrator process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStats {
    /// Always `running` while the orchestrator answers.
    pub status: String,
    /// OS process id.
    pub pid: u32,
    /// When the orchestrator started.
    pub started_at: DateTime<Utc>,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Memory usage.
    pub memory: MemoryStats,
}

/// Process memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Resident set size.
    pub rss_bytes: u64,
    /// Virtual memory size.
    pub virtual_bytes: u64,
}

/// Number of descriptors in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCounts {
    pub total: usize,
    pub installed: usize,
    pub starting: usize,
    pub running: usize,
    pub stopped: usize,
    pub disconnected: usize,
    pub error: usize,
}

impl AgentCounts {
    /// Builds the counts from per-status tallies.
    pub fn from_tallies(tallies: &[(AgentStatus, usize)]) -> Self {
        let mut counts = Self::default();
        for (status, n) in tallies {
            let slot = match status {
                AgentStatus::Installed => &mut counts.installed,
                AgentStatus::Starting => &mut counts.starting,
                AgentStatus::Running => &mut counts.running,
                AgentStatus::Stopped => &mut counts.stopped,
                AgentStatus::Disconnected => &mut counts.disconnected,
                AgentStatus::Error => &mut counts.error,
            };
            *slot += n;
            counts.total += n;
        }
        counts
    }
}
