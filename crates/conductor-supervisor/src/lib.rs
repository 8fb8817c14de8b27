//! Process supervisor for Conductor.
//!
//! This crate owns the OS processes behind agents:
//! - `Supervisor` - install, start, stop, restart and uninstall
//! - `ProcessHandle` - one live process, owned by its supervising task
//! - `AgentLocks` - per-agent serialization of lifecycle transitions
//!
//! # Example
//!
//! ```ignore
//! use conductor_supervisor::{Supervisor, SupervisorConfig};
//! use conductor_models::InstallOptions;
//!
//! let supervisor = Supervisor::new(SupervisorConfig::default(), rpc);
//! supervisor.install("agent-rest", InstallOptions::default()).await?;
//! supervisor.start("agent-rest").await?;
//! // ... the agent dials back and registers
//! supervisor.stop("agent-rest").await?;
//! ```
//!
//! # Lifecycle
//!
//! `start` marks the descriptor `starting` and records the pid. The agent
//! becomes `running` only when it registers over its duplex channel. When
//! the process exits, for whatever reason, its supervising task removes the
//! handle and marks the descriptor `stopped`.

pub mod config;
pub mod error;
pub mod locks;
pub mod process;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use error::{Result, SupervisorError};
pub use locks::AgentLocks;
pub use process::ProcessHandle;
pub use supervisor::Supervisor;
