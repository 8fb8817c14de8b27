//! Agent descriptor types.
//!
//! A descriptor is the orchestrator's in-memory record of one agent: who it
//! is, where it is installed, and where it is in its lifecycle.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version assigned to agents installed without an explicit version.
pub const DEFAULT_AGENT_VERSION: &str = "1.0.0";

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Installed but never started.
    #[default]
    Installed,
    /// Process spawned, waiting for the agent to register.
    Starting,
    /// Agent registered over the duplex channel.
    Running,
    /// Process exited or was stopped.
    Stopped,
    /// Duplex channel closed; the process may still be alive.
    Disconnected,
    /// Lifecycle operation failed.
    Error,
}

impl AgentStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [AgentStatus; 6] = [
        AgentStatus::Installed,
        AgentStatus::Starting,
        AgentStatus::Running,
        AgentStatus::Stopped,
        AgentStatus::Disconnected,
        AgentStatus::Error,
    ];

    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Installed => "installed",
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Disconnected => "disconnected",
            AgentStatus::Error => "error",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit program and arguments used to launch an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// Creates a launch spec.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Options accepted by `install`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOptions {
    /// Human readable name (defaults to the agent id).
    #[serde(default)]
    pub name: Option<String>,
    /// Version (defaults to `1.0.0`).
    #[serde(default)]
    pub version: Option<String>,
    /// Program overriding the supervisor's default launcher.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments for `command`.
    #[serde(default)]
    pub args: Vec<String>,
}

impl InstallOptions {
    /// Returns the launch override, if a command was given.
    pub fn launch(&self) -> Option<LaunchSpec> {
        self.command
            .as_ref()
            .map(|program| LaunchSpec::new(program.clone(), self.args.clone()))
    }
}

/// Handshake payload an agent sends with `register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Agent id (must match the `AGENT_ID` it was spawned with).
    pub id: String,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Agent version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Anything else the agent reports (category, port, capabilities, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl AgentInfo {
    /// Creates a handshake payload with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
            metadata: Map::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Descriptor fields an agent's registration metadata may not shadow.
const DESCRIPTOR_KEYS: &[&str] = &[
    "id",
    "name",
    "version",
    "path",
    "status",
    "installedAt",
    "connectedAt",
    "disconnectedAt",
    "pid",
    "launch",
];

/// The orchestrator's record of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Unique agent id.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Agent version.
    pub version: String,
    /// Install directory, if the agent was installed through the supervisor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// When the agent was installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    /// When the agent last registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    /// When the agent's channel last closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<DateTime<Utc>>,
    /// OS process id of the current process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Launch override recorded at install time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch: Option<LaunchSpec>,
    /// Registration metadata.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl AgentDescriptor {
    /// Creates a descriptor for a freshly installed agent.
    pub fn installed(id: impl Into<String>, path: PathBuf, options: &InstallOptions) -> Self {
        let id = id.into();
        Self {
            name: options.name.clone().unwrap_or_else(|| id.clone()),
            version: options
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_AGENT_VERSION.to_string()),
            path: Some(path),
            status: AgentStatus::Installed,
            installed_at: Some(Utc::now()),
            connected_at: None,
            disconnected_at: None,
            pid: None,
            launch: options.launch(),
            metadata: Map::new(),
            id,
        }
    }

    /// Creates a descriptor for an agent that registered without an install.
    pub fn from_registration(info: AgentInfo) -> Self {
        let mut descriptor = Self {
            id: info.id.clone(),
            name: info.id.clone(),
            version: DEFAULT_AGENT_VERSION.to_string(),
            path: None,
            status: AgentStatus::Installed,
            installed_at: None,
            connected_at: None,
            disconnected_at: None,
            pid: None,
            launch: None,
            metadata: Map::new(),
        };
        descriptor.merge_registration(info);
        descriptor
    }

    /// Merges a registration handshake and marks the agent running.
    ///
    /// Install path, pid and launch override are kept. Metadata keys that
    /// collide with descriptor fields are dropped.
    pub fn merge_registration(&mut self, info: AgentInfo) {
        if let Some(name) = info.name {
            self.name = name;
        }
        if let Some(version) = info.version {
            self.version = version;
        }
        self.metadata.extend(
            info.metadata
                .into_iter()
                .filter(|(key, _)| !DESCRIPTOR_KEYS.contains(&key.as_str())),
        );
        self.status = AgentStatus::Running;
        self.connected_at = Some(Utc::now());
    }

    /// Marks the agent's channel as closed.
    pub fn mark_disconnected(&mut self) {
        self.status = AgentStatus::Disconnected;
        self.disconnected_at = Some(Utc::now());
    }

    /// Marks the agent's process as gone.
    pub fn mark_stopped(&mut self) {
        self.status = AgentStatus::Stopped;
        self.pid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AgentStatus::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");

        let status: AgentStatus = serde_json::from_str("\"starting\"").unwrap();
        assert_eq!(status, AgentStatus::Starting);
        assert_eq!(status.to_string(), "starting");
    }

    #[test]
    fn test_installed_defaults() {
        let descriptor =
            AgentDescriptor::installed("agent-rest", PathBuf::from("/tmp/agent-rest"), &InstallOptions::default());

        assert_eq!(descriptor.name, "agent-rest");
        assert_eq!(descriptor.version, DEFAULT_AGENT_VERSION);
        assert_eq!(descriptor.status, AgentStatus::Installed);
        assert!(descriptor.installed_at.is_some());
        assert!(descriptor.launch.is_none());
    }

    #[test]
    fn test_install_options_launch() {
        let options: InstallOptions = serde_json::from_value(json!({
            "name": "Worker",
            "command": "python3",
            "args": ["main.py"]
        }))
        .unwrap();

        let launch = options.launch().unwrap();
        assert_eq!(launch.program, "python3");
        assert_eq!(launch.args, vec!["main.py".to_string()]);
    }

    #[test]
    fn test_merge_registration_keeps_install_fields() {
        let mut descriptor =
            AgentDescriptor::installed("agent-mysql", PathBuf::from("/srv/agent-mysql"), &InstallOptions::default());
        descriptor.pid = Some(4242);

        let info: AgentInfo = serde_json::from_value(json!({
            "id": "agent-mysql",
            "name": "MySQL Agent",
            "version": "1.2.0",
            "category": "database",
            "port": 4101
        }))
        .unwrap();
        descriptor.merge_registration(info);

        assert_eq!(descriptor.status, AgentStatus::Running);
        assert_eq!(descriptor.name, "MySQL Agent");
        assert_eq!(descriptor.version, "1.2.0");
        assert_eq!(descriptor.pid, Some(4242));
        assert_eq!(descriptor.path, Some(PathBuf::from("/srv/agent-mysql")));
        assert_eq!(descriptor.metadata["category"], json!("database"));
        assert!(descriptor.connected_at.is_some());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = AgentDescriptor::from_registration(
            AgentInfo::new("agent-openai").with_name("OpenAI GPT Agent"),
        );
        let value = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(value["id"], "agent-openai");
        assert_eq!(value["status"], "running");
        assert!(value.get("connectedAt").is_some());
        assert!(value.get("path").is_none());
        assert!(value.get("pid").is_none());
    }

    #[test]
    fn test_registration_cannot_shadow_descriptor_fields() {
        let info: AgentInfo = serde_json::from_value(json!({
            "id": "a",
            "status": "installed",
            "pid": 1,
            "connectedAt": "1970-01-01T00:00:00Z",
            "path": "/elsewhere",
            "category": "database"
        }))
        .unwrap();

        let descriptor = AgentDescriptor::from_registration(info);
        assert_eq!(descriptor.metadata.len(), 1);

        let wire = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(wire.matches("\"status\"").count(), 1);

        let value: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value["status"], "running");
        assert_eq!(value["category"], "database");
        assert!(value.get("pid").is_none());
        assert!(value.get("path").is_none());
        assert_ne!(value["connectedAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_mark_transitions() {
        let mut descriptor = AgentDescriptor::from_registration(AgentInfo::new("a"));
        descriptor.pid = Some(1);

        descriptor.mark_disconnected();
        assert_eq!(descriptor.status, AgentStatus::Disconnected);
        assert!(descriptor.disconnected_at.is_some());

        descriptor.mark_stopped();
        assert_eq!(descriptor.status, AgentStatus::Stopped);
        assert!(descriptor.pid.is_none());
    }
}
