//! Process supervisor for agent lifecycles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use conductor_models::{AgentDescriptor, AgentStatus, InstallOptions, LaunchSpec};
use conductor_rpc::{AgentDirectory, AgentRpc, EventHub, Notification, OrchestratorEvent, RpcError};

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use crate::locks::AgentLocks;
use crate::process::{self, ExitContext, ProcessHandle, ProcessTable};

/// Installs, starts, stops and restarts agent processes.
pub struct Supervisor {
    /// Configuration.
    config: SupervisorConfig,
    /// Messaging layer, used for graceful shutdown notifications.
    rpc: AgentRpc,
    /// Shared descriptor table.
    directory: Arc<AgentDirectory>,
    /// Live processes keyed by agent id.
    processes: ProcessTable,
    /// Per-agent lifecycle locks.
    locks: AgentLocks,
}

impl Supervisor {
    /// Creates a supervisor sharing the RPC layer's descriptor table.
    pub fn new(config: SupervisorConfig, rpc: AgentRpc) -> Self {
        let directory = Arc::clone(rpc.registry().directory());
        Self {
            config,
            rpc,
            directory,
            processes: Arc::new(RwLock::new(HashMap::new())),
            locks: AgentLocks::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Returns the descriptor table.
    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    fn events(&self) -> &EventHub {
        self.rpc.registry().events()
    }

    /// Installs (or reinstalls) an agent.
    ///
    /// Creates the working directory and writes a fresh descriptor. Last
    /// write wins; if the agent is live (process or connection) its
    /// lifecycle fields are kept.
    pub async fn install(&self, agent_id: &str, options: InstallOptions) -> Result<AgentDescriptor> {
        let _guard = self.locks.acquire(agent_id).await;

        let path = self.config.agent_dir(agent_id);
        tokio::fs::create_dir_all(&path).await?;

        let running = self.processes.read().await.contains_key(agent_id)
            || self.rpc.registry().is_connected(agent_id).await;
        let fresh = AgentDescriptor::installed(agent_id, path, &options);
        let descriptor = self
            .directory
            .upsert(
                agent_id,
                || fresh.clone(),
                |d| {
                    if running {
                        d.name = fresh.name.clone();
                        d.version = fresh.version.clone();
                        d.path = fresh.path.clone();
                        d.installed_at = fresh.installed_at;
                        d.launch = fresh.launch.clone();
                    } else {
                        *d = fresh.clone();
                    }
                },
            )
            .await;

        info!(agent_id = %agent_id, version = %descriptor.version, "agent installed");
        Ok(descriptor)
    }

    /// Spawns the agent's process.
    pub async fn start(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let _guard = self.locks.acquire(agent_id).await;
        self.start_locked(agent_id).await
    }

    async fn start_locked(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let descriptor = self
            .directory
            .get(agent_id)
            .await
            .ok_or_else(|| SupervisorError::NotFound(agent_id.to_string()))?;

        if self.processes.read().await.contains_key(agent_id) {
            return Err(SupervisorError::AlreadyRunning(agent_id.to_string()));
        }

        let dir = descriptor
            .path
            .clone()
            .unwrap_or_else(|| self.config.agent_dir(agent_id));
        let launch = descriptor.launch.clone().unwrap_or_else(|| {
            LaunchSpec::new(
                self.config.program.clone(),
                vec![self.config.entrypoint_in(&dir).display().to_string()],
            )
        });

        info!(agent_id = %agent_id, program = %launch.program, "starting agent");

        let (handle, child, exited_tx) =
            match process::spawn(agent_id, &dir, &launch, &self.config.callback_url, self.events()) {
                Ok(spawned) => spawned,
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "failed to spawn agent");
                    self.directory.set_status(agent_id, AgentStatus::Error).await;
                    return Err(SupervisorError::Spawn {
                        agent_id: agent_id.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

        let pid = handle.pid;
        {
            let mut processes = self.processes.write().await;
            processes.insert(agent_id.to_string(), handle.clone());
        }
        let descriptor = self
            .directory
            .update(agent_id, |d| {
                d.status = AgentStatus::Starting;
                d.pid = pid;
            })
            .await
            .unwrap_or(descriptor);

        info!(agent_id = %agent_id, pid = ?pid, "agent process started");
        self.events().emit(OrchestratorEvent::AgentStarted {
            id: agent_id.to_string(),
            pid,
        });

        // Exit bookkeeping starts only once the handle and pid are recorded
        process::supervise(
            child,
            &handle,
            exited_tx,
            ExitContext {
                processes: Arc::clone(&self.processes),
                directory: Arc::clone(&self.directory),
                events: self.events().clone(),
            },
        );

        Ok(descriptor)
    }

    /// Stops the agent's process, gracefully if it is connected.
    pub async fn stop(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let _guard = self.locks.acquire(agent_id).await;
        self.stop_locked(agent_id).await
    }

    async fn stop_locked(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let handle = self
            .processes
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| SupervisorError::NotRunning(agent_id.to_string()))?;

        info!(agent_id = %agent_id, pid = ?handle.pid, "stopping agent");

        match self.rpc.notify(agent_id, Notification::Shutdown).await {
            Ok(()) => {
                let grace = self.config.grace_period;
                if tokio::time::timeout(grace, handle.wait()).await.is_err() {
                    warn!(
                        agent_id = %agent_id,
                        grace_ms = grace.as_millis() as u64,
                        "agent ignored shutdown, killing"
                    );
                }
            }
            Err(RpcError::NotConnected(_)) => {
                debug!(agent_id = %agent_id, "agent not connected, killing");
            }
            Err(e) => {
                debug!(agent_id = %agent_id, error = %e, "shutdown notification failed, killing");
            }
        }

        if !handle.has_exited() {
            handle.kill();
            handle.wait().await;
        }

        let descriptor = self
            .directory
            .update(agent_id, |d| {
                if d.pid == handle.pid {
                    d.mark_stopped();
                }
            })
            .await;

        info!(agent_id = %agent_id, "agent stopped");
        descriptor.ok_or_else(|| SupervisorError::NotFound(agent_id.to_string()))
    }

    /// Stops, waits the restart delay, and starts the agent again. No other
    /// lifecycle operation on the agent can interleave.
    pub async fn restart(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let _guard = self.locks.acquire(agent_id).await;

        if !self.directory.contains(agent_id).await {
            return Err(SupervisorError::NotFound(agent_id.to_string()));
        }

        info!(agent_id = %agent_id, "restarting agent");
        self.stop_locked(agent_id).await?;
        tokio::time::sleep(self.config.restart_delay).await;
        self.start_locked(agent_id).await
    }

    /// Stops the agent if it is running and removes its descriptor.
    pub async fn uninstall(&self, agent_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(agent_id).await;

        let running = self.processes.read().await.contains_key(agent_id);
        if running {
            match self.stop_locked(agent_id).await {
                Ok(_) | Err(SupervisorError::NotFound(_)) | Err(SupervisorError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let removed = self.directory.remove(agent_id).await;
        if removed.is_none() && !running {
            return Err(SupervisorError::NotFound(agent_id.to_string()));
        }

        if self.config.remove_artifacts {
            if let Some(path) = removed.as_ref().and_then(|d| d.path.as_ref()) {
                match tokio::fs::remove_dir_all(path).await {
                    Ok(()) => debug!(agent_id = %agent_id, path = %path.display(), "removed agent files"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        info!(agent_id = %agent_id, "agent uninstalled");
        Ok(())
    }

    /// Stops every supervised process. Failures are logged, not returned.
    pub async fn stop_all(&self) {
        let ids: Vec<String> = self.processes.read().await.keys().cloned().collect();
        info!(count = ids.len(), "stopping all agents");

        for agent_id in ids {
            match self.stop(&agent_id).await {
                Ok(_) | Err(SupervisorError::NotRunning(_)) => {}
                Err(e) => warn!(agent_id = %agent_id, error = %e, "failed to stop agent"),
            }
        }
    }

    /// Lists all descriptors.
    pub async fn list(&self) -> Vec<AgentDescriptor> {
        self.directory.list().await
    }

    /// Gets one descriptor.
    pub async fn get(&self, agent_id: &str) -> Result<AgentDescriptor> {
        self.directory
            .get(agent_id)
            .await
            .ok_or_else(|| SupervisorError::NotFound(agent_id.to_string()))
    }

    /// Returns true if the agent has a live process.
    pub async fn is_running(&self, agent_id: &str) -> bool {
        self.processes.read().await.contains_key(agent_id)
    }

    /// Returns the live process handle for an agent.
    pub async fn process(&self, agent_id: &str) -> Option<ProcessHandle> {
        self.processes.read().await.get(agent_id).cloned()
    }

    /// Number of live processes.
    pub async fn process_count(&self) -> usize {
        self.processes.read().await.len()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use conductor_models::{AgentInfo, OutboundFrame};
    use conductor_rpc::{Connection, ConnectionRegistry, RpcConfig};
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_supervisor(dir: &TempDir) -> Supervisor {
        let registry = ConnectionRegistry::new(Arc::new(AgentDirectory::new()), EventHub::new());
        let rpc = AgentRpc::new(Arc::new(registry), RpcConfig::default());
        let config = SupervisorConfig::new()
            .with_agents_dir(dir.path())
            .with_grace_period(Duration::from_millis(200))
            .with_restart_delay(Duration::from_millis(10));
        Supervisor::new(config, rpc)
    }

    fn sh(script: &str) -> InstallOptions {
        InstallOptions {
            command: Some("sh".into()),
            args: vec!["-c".into(), script.into()],
            ..Default::default()
        }
    }

    fn sleeper() -> InstallOptions {
        InstallOptions {
            command: Some("sleep".into()),
            args: vec!["30".into()],
            ..Default::default()
        }
    }

    async fn wait_for_status(sup: &Supervisor, id: &str, status: AgentStatus) {
        for _ in 0..200 {
            if sup.get(id).await.ok().map(|d| d.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("agent {} never reached {}", id, status);
    }

    #[tokio::test]
    async fn test_install_creates_directory_and_descriptor() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);

        let descriptor = sup
            .install(
                "agent-rest",
                InstallOptions {
                    name: Some("REST API Agent".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(descriptor.status, AgentStatus::Installed);
        assert_eq!(descriptor.name, "REST API Agent");
        assert_eq!(descriptor.version, "1.0.0");
        assert!(dir.path().join("agent-rest").is_dir());
        assert_eq!(sup.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_start_unknown_agent() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);

        let err = sup.start("ghost").await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_start_sets_starting_and_pid() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();

        let descriptor = sup.start("a").await.unwrap();
        assert_eq!(descriptor.status, AgentStatus::Starting);
        assert!(descriptor.pid.is_some());
        assert!(sup.is_running("a").await);

        sup.stop("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_double_start_already_running() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();

        sup.start("a").await.unwrap();
        let err = sup.start("a").await.unwrap_err();

        assert!(matches!(err, SupervisorError::AlreadyRunning(_)));
        assert_eq!(sup.process_count().await, 1);

        sup.stop("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_starts_spawn_once() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();

        let (first, second) = tokio::join!(sup.start("a"), sup.start("a"));

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(sup.process_count().await, 1);

        sup.stop("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_not_running_leaves_tables_unchanged() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();
        let before = sup.get("a").await.unwrap();

        let err = sup.stop("a").await.unwrap_err();

        assert!(matches!(err, SupervisorError::NotRunning(_)));
        assert_eq!(sup.get("a").await.unwrap(), before);
        assert_eq!(sup.process_count().await, 0);
    }

    #[tokio::test]
    async fn test_stop_kills_unconnected_process() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();
        sup.start("a").await.unwrap();

        let descriptor = sup.stop("a").await.unwrap();

        assert_eq!(descriptor.status, AgentStatus::Stopped);
        assert!(descriptor.pid.is_none());
        assert!(!sup.is_running("a").await);
    }

    #[tokio::test]
    async fn test_stop_notifies_connected_agent_then_kills() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();
        sup.start("a").await.unwrap();

        let (conn, mut rx) = Connection::new();
        sup.rpc.registry().register(&conn, AgentInfo::new("a")).await.unwrap();

        let descriptor = sup.stop("a").await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), OutboundFrame::Shutdown);
        assert_eq!(descriptor.status, AgentStatus::Stopped);
        assert_eq!(sup.process_count().await, 0);
    }

    #[tokio::test]
    async fn test_natural_exit_marks_stopped() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        let mut events = sup.events().subscribe();
        sup.install("a", sh("exit 3")).await.unwrap();

        sup.start("a").await.unwrap();
        wait_for_status(&sup, "a", AgentStatus::Stopped).await;

        assert!(!sup.is_running("a").await);
        loop {
            if let OrchestratorEvent::AgentStopped { id, exit_code } = events.recv().await.unwrap() {
                assert_eq!(id, "a");
                assert_eq!(exit_code, Some(3));
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_output_and_environment_captured() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        let mut events = sup.events().subscribe();
        sup.install("agent-env", sh("echo \"$AGENT_ID $ORCHESTRATOR_URL\"; echo oops >&2"))
            .await
            .unwrap();

        sup.start("agent-env").await.unwrap();

        let mut stdout = None;
        let mut stderr = None;
        while stdout.is_none() || stderr.is_none() {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap();
            if let OrchestratorEvent::AgentOutput { stream, line, .. } = event {
                match stream {
                    conductor_rpc::OutputStream::Stdout => stdout = Some(line),
                    conductor_rpc::OutputStream::Stderr => stderr = Some(line),
                }
            }
        }

        assert_eq!(stdout.unwrap(), "agent-env http://localhost:4000");
        assert_eq!(stderr.unwrap(), "oops");
    }

    #[tokio::test]
    async fn test_spawn_failure_sets_error() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install(
            "a",
            InstallOptions {
                command: Some("/nonexistent/agent-binary".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = sup.start("a").await.unwrap_err();

        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert_eq!(sup.get("a").await.unwrap().status, AgentStatus::Error);
        assert_eq!(sup.process_count().await, 0);
    }

    #[tokio::test]
    async fn test_restart_replaces_process() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();
        sup.start("a").await.unwrap();
        let first = sup.process("a").await.unwrap().instance;

        let descriptor = sup.restart("a").await.unwrap();

        assert_eq!(descriptor.status, AgentStatus::Starting);
        let second = sup.process("a").await.unwrap().instance;
        assert_ne!(first, second);
        assert_eq!(sup.process_count().await, 1);

        sup.stop("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_start_during_restart_delay_waits_for_restart() {
        let dir = TempDir::new().unwrap();
        let registry = ConnectionRegistry::new(Arc::new(AgentDirectory::new()), EventHub::new());
        let rpc = AgentRpc::new(Arc::new(registry), RpcConfig::default());
        let config = SupervisorConfig::new()
            .with_agents_dir(dir.path())
            .with_grace_period(Duration::from_millis(200))
            .with_restart_delay(Duration::from_millis(500));
        let sup = Arc::new(Supervisor::new(config, rpc));
        sup.install("a", sleeper()).await.unwrap();
        sup.start("a").await.unwrap();

        let restarting = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.restart("a").await })
        };

        // The old process is gone and the new one not yet spawned
        wait_for_status(&sup, "a", AgentStatus::Stopped).await;
        assert_eq!(sup.process_count().await, 0);

        let err = sup.start("a").await.unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning(_)));

        let restarted = restarting.await.unwrap().unwrap();
        assert_eq!(restarted.status, AgentStatus::Starting);
        assert_eq!(sup.process_count().await, 1);

        sup.stop("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_not_running() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();

        assert!(matches!(
            sup.restart("a").await.unwrap_err(),
            SupervisorError::NotRunning(_)
        ));
        assert!(matches!(
            sup.restart("ghost").await.unwrap_err(),
            SupervisorError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_uninstall_stops_and_removes() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        sup.install("a", sleeper()).await.unwrap();
        sup.start("a").await.unwrap();

        sup.uninstall("a").await.unwrap();

        assert!(!sup.is_running("a").await);
        assert!(sup.get("a").await.is_err());
        // Files are kept unless removal is enabled
        assert!(dir.path().join("a").is_dir());

        assert!(matches!(
            sup.uninstall("a").await.unwrap_err(),
            SupervisorError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_uninstall_removes_artifacts_when_enabled() {
        let dir = TempDir::new().unwrap();
        let registry = ConnectionRegistry::new(Arc::new(AgentDirectory::new()), EventHub::new());
        let rpc = AgentRpc::new(Arc::new(registry), RpcConfig::default());
        let sup = Supervisor::new(
            SupervisorConfig::new()
                .with_agents_dir(dir.path())
                .with_remove_artifacts(true),
            rpc,
        );
        sup.install("a", InstallOptions::default()).await.unwrap();

        sup.uninstall("a").await.unwrap();
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_stop_all() {
        let dir = TempDir::new().unwrap();
        let sup = make_supervisor(&dir);
        for id in ["a", "b"] {
            sup.install(id, sleeper()).await.unwrap();
            sup.start(id).await.unwrap();
        }

        sup.stop_all().await;

        assert_eq!(sup.process_count().await, 0);
        assert_eq!(sup.get("a").await.unwrap().status, AgentStatus::Stopped);
        assert_eq!(sup.get("b").await.unwrap().status, AgentStatus::Stopped);
    }
}
