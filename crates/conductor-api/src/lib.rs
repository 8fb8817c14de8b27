//! HTTP and WebSocket surface for Conductor.
//!
//! This crate exposes the orchestrator over axum:
//! - Agent lifecycle (install, start, stop, restart, uninstall)
//! - Messaging (message, execute, config, broadcast)
//! - Workflows, metrics, health and the agent catalog
//! - `/agents/connect` - the duplex channel agents dial back to
//! - `/api/events` - the observer event stream
//!
//! Every JSON response uses the envelope `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`.
//!
//! # Example
//!
//! ```ignore
//! use conductor_api::{serve, ApiConfig, AppState};
//! use conductor_rpc::RpcConfig;
//! use conductor_supervisor::SupervisorConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::new(ApiConfig::default(), SupervisorConfig::default(), RpcConfig::default());
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve, serve_with_shutdown};
pub use state::AppState;
