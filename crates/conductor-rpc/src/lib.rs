//! Connection registry and RPC messaging layer for Conductor.
//!
//! This crate owns everything that talks to agents once they are alive:
//! - `AgentDirectory` - the table of agent descriptors
//! - `Connection` - one duplex channel with correlated request tracking
//! - `ConnectionRegistry` - which agents currently have a live channel
//! - `AgentRpc` - unicast calls, notifications, broadcast and inbound dispatch
//! - `EventHub` - notifications for observing clients
//!
//! The transport is abstract: a `Connection` is fed inbound frames through
//! `AgentRpc::handle_inbound` and drains outbound frames from the receiver
//! returned by `Connection::new`. The HTTP layer wires both ends to a
//! WebSocket.
//!
//! # Example
//!
//! ```ignore
//! use conductor_rpc::{AgentDirectory, AgentRpc, Connection, ConnectionRegistry, EventHub, RpcConfig};
//! use conductor_models::{InboundFrame, Request};
//! use std::sync::Arc;
//!
//! let directory = Arc::new(AgentDirectory::new());
//! let registry = Arc::new(ConnectionRegistry::new(directory, EventHub::new()));
//! let rpc = AgentRpc::new(registry, RpcConfig::default());
//!
//! let (conn, mut outbound) = Connection::new();
//! rpc.handle_inbound(&conn, frame_from_agent).await?;
//! let result = rpc.call("agent-rest", Request::message(json!({"ping": true}))).await?;
//! ```

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod event;
pub mod registry;
pub mod rpc;

pub use config::RpcConfig;
pub use connection::Connection;
pub use directory::AgentDirectory;
pub use error::{Result, RpcError};
pub use event::{EventHub, OrchestratorEvent, OutputStream};
pub use registry::ConnectionRegistry;
pub use rpc::{AgentRpc, CallOptions, Notification};
