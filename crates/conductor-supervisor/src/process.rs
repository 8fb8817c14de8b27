//! Spawning and supervising one agent process.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use conductor_models::LaunchSpec;
use conductor_rpc::{AgentDirectory, EventHub, OrchestratorEvent, OutputStream};

/// Live processes keyed by agent id.
pub(crate) type ProcessTable = Arc<RwLock<HashMap<String, ProcessHandle>>>;

/// A live OS process bound to one agent id.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    /// Agent id.
    pub agent_id: String,
    /// OS process id.
    pub pid: Option<u32>,
    /// Distinguishes successive processes of the same agent.
    pub instance: Uuid,
    /// When the process was spawned.
    pub started_at: DateTime<Utc>,
    kill: CancellationToken,
    exited: watch::Receiver<bool>,
}

impl ProcessHandle {
    /// Asks the supervising task to forcibly terminate the process.
    pub fn kill(&self) {
        self.kill.cancel();
    }

    /// Returns true once the process has exited.
    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Waits until the process has exited and its bookkeeping is done.
    pub async fn wait(&self) {
        let mut exited = self.exited.clone();
        // Err means the supervising task is gone, which only happens after exit
        let _ = exited.wait_for(|done| *done).await;
    }
}

/// Everything the supervising task updates when the process exits.
#[derive(Clone)]
pub(crate) struct ExitContext {
    pub processes: ProcessTable,
    pub directory: Arc<AgentDirectory>,
    pub events: EventHub,
}

/// Spawns the process and starts its output capture.
///
/// The returned child must be handed to [`supervise`] once the handle is
/// stored in the process table.
pub(crate) fn spawn(
    agent_id: &str,
    dir: &Path,
    launch: &LaunchSpec,
    callback_url: &str,
    events: &EventHub,
) -> std::io::Result<(ProcessHandle, Child, watch::Sender<bool>)> {
    debug!(
        agent_id = %agent_id,
        program = %launch.program,
        args = ?launch.args,
        dir = %dir.display(),
        "spawning agent process"
    );

    let mut child = Command::new(&launch.program)
        .args(&launch.args)
        .current_dir(dir)
        .env("ORCHESTRATOR_URL", callback_url)
        .env("AGENT_ID", agent_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        capture_lines(stdout, agent_id.to_string(), OutputStream::Stdout, events.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        capture_lines(stderr, agent_id.to_string(), OutputStream::Stderr, events.clone());
    }

    let (exited_tx, exited) = watch::channel(false);
    let handle = ProcessHandle {
        agent_id: agent_id.to_string(),
        pid: child.id(),
        instance: Uuid::new_v4(),
        started_at: Utc::now(),
        kill: CancellationToken::new(),
        exited,
    };

    Ok((handle, child, exited_tx))
}

fn capture_lines<R>(reader: R, agent_id: String, stream: OutputStream, events: EventHub)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    match stream {
                        OutputStream::Stdout => info!(agent_id = %agent_id, "{}", line),
                        OutputStream::Stderr => warn!(agent_id = %agent_id, "{}", line),
                    }
                    events.emit(OrchestratorEvent::AgentOutput {
                        id: agent_id.clone(),
                        stream,
                        line,
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(agent_id = %agent_id, error = %e, "output capture ended");
                    break;
                }
            }
        }
    });
}

/// Owns the child until it exits, then clears its bookkeeping.
///
/// The handle is removed and the descriptor marked stopped only if this
/// instance is still the agent's current process.
pub(crate) fn supervise(
    mut child: Child,
    handle: &ProcessHandle,
    exited_tx: watch::Sender<bool>,
    ctx: ExitContext,
) {
    let agent_id = handle.agent_id.clone();
    let instance = handle.instance;
    let kill = handle.kill.clone();

    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = kill.cancelled() => {
                debug!(agent_id = %agent_id, "killing agent process");
                if let Err(e) = child.start_kill() {
                    warn!(agent_id = %agent_id, error = %e, "failed to kill agent process");
                }
                child.wait().await
            }
        };

        let exit_code = match &status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "failed to wait for agent process");
                None
            }
        };

        let current = {
            let mut processes = ctx.processes.write().await;
            let is_current = processes
                .get(&agent_id)
                .map(|h| h.instance == instance)
                .unwrap_or(false);
            if is_current {
                processes.remove(&agent_id);
            }
            is_current
        };

        if current {
            ctx.directory.update(&agent_id, |d| d.mark_stopped()).await;
        }

        info!(agent_id = %agent_id, exit_code = ?exit_code, "agent process exited");
        ctx.events.emit(OrchestratorEvent::AgentStopped {
            id: agent_id.clone(),
            exit_code,
        });

        let _ = exited_tx.send(true);
    });
}
