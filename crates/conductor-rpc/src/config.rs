//! RPC configuration.

use std::time::Duration;

/// Default deadline for a single agent call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the RPC layer.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Deadline applied to every call. `None` waits forever.
    pub call_timeout: Option<Duration>,
    /// Capacity of the observer event channel.
    pub event_capacity: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            event_capacity: 256,
        }
    }
}

impl RpcConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the call deadline.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the observer channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
