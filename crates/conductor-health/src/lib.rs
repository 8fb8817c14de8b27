//! Health and metrics aggregation for Conductor.
//!
//! - `MetricsAggregator::collect_metrics` asks every connected agent for its
//!   status concurrently.
//! - `MetricsAggregator::global_health` reports the orchestrator's own
//!   process stats and fleet counts without touching the network.

pub mod aggregator;
pub mod report;

pub use aggregator::MetricsAggregator;
pub use report::{AgentCounts, HealthReport, MemoryStats, OrchestratorStats};
