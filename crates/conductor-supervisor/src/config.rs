//! Supervisor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the process supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Directory holding one working directory per agent.
    pub agents_dir: PathBuf,
    /// Launcher used when an agent has no launch override.
    pub program: String,
    /// Entry point passed to `program`, relative to the agent directory.
    pub entrypoint: String,
    /// Address agents dial back to, exported as `ORCHESTRATOR_URL`.
    pub callback_url: String,
    /// How long `stop` waits for a graceful exit before killing.
    pub grace_period: Duration,
    /// Pause between stop and start during `restart`.
    pub restart_delay: Duration,
    /// Whether `uninstall` deletes the agent's working directory.
    pub remove_artifacts: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            program: "node".to_string(),
            entrypoint: "index.js".to_string(),
            callback_url: "http://localhost:4000".to_string(),
            grace_period: Duration::from_secs(2),
            restart_delay: Duration::from_secs(1),
            remove_artifacts: false,
        }
    }
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

impl SupervisorConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the agents directory.
    pub fn with_agents_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.agents_dir = dir.into();
        self
    }

    /// Sets the default launcher program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets the entry point file.
    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = entrypoint.into();
        self
    }

    /// Sets the callback URL handed to agents.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    /// Sets the stop grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Sets the restart delay.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Enables or disables artifact removal on uninstall.
    pub fn with_remove_artifacts(mut self, remove: bool) -> Self {
        self.remove_artifacts = remove;
        self
    }

    /// Working directory for an agent.
    pub fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.agents_dir.join(agent_id)
    }

    /// Default entry point path for an agent installed at `dir`.
    pub fn entrypoint_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.entrypoint)
    }
}
