//! One duplex channel to an agent.
//!
//! A `Connection` is transport-agnostic: outbound frames are queued on an
//! unbounded channel whose receiver the transport drains, and the transport
//! hands inbound replies back through `resolve`. Requests are correlated by
//! a UUID; every pending request holds a oneshot sender in the pending table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use conductor_models::{OutboundFrame, Reply, Request};

use crate::error::{Result, RpcError};

type PendingTable = HashMap<Uuid, oneshot::Sender<Reply>>;

struct ConnectionInner {
    id: Uuid,
    agent_id: OnceLock<String>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    pending: Mutex<PendingTable>,
    closed: CancellationToken,
}

/// Handle to a live duplex channel. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("agent_id", &self.inner.agent_id.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Removes a pending entry when the awaiting call goes away, whatever the
/// reason (reply, deadline, cancellation, or the caller being dropped).
struct PendingGuard<'a> {
    conn: &'a Connection,
    id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.conn.lock_pending().remove(&self.id);
    }
}

impl Connection {
    /// Creates a connection and the receiver its transport must drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let conn = Self {
            inner: Arc::new(ConnectionInner {
                id: Uuid::new_v4(),
                agent_id: OnceLock::new(),
                outbound,
                pending: Mutex::new(HashMap::new()),
                closed: CancellationToken::new(),
            }),
        };
        (conn, rx)
    }

    /// Unique id of this channel.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Agent id stamped at registration, if any.
    pub fn agent_id(&self) -> Option<&str> {
        self.inner.agent_id.get().map(String::as_str)
    }

    /// Stamps the channel with its agent id. A channel belongs to one agent
    /// for its whole life; re-stamping with another id fails.
    pub(crate) fn stamp(&self, agent_id: &str) -> Result<()> {
        let stamped = self.inner.agent_id.get_or_init(|| agent_id.to_string());
        if stamped == agent_id {
            Ok(())
        } else {
            Err(RpcError::Protocol(format!(
                "connection already registered as {}, cannot register as {}",
                stamped, agent_id
            )))
        }
    }

    /// Returns true if both handles refer to the same channel.
    pub fn same_channel(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true once the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled() || self.inner.outbound.is_closed()
    }

    /// Resolves when the channel is closed.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingTable> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn label(&self) -> String {
        self.agent_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.inner.id.to_string())
    }

    /// Queues a frame without waiting for any reply.
    pub fn send(&self, frame: OutboundFrame) -> Result<()> {
        if self.inner.closed.is_cancelled() {
            return Err(RpcError::Transport(format!(
                "connection to {} is closed",
                self.label()
            )));
        }
        self.inner.outbound.send(frame).map_err(|_| {
            RpcError::Transport(format!("connection to {} is closed", self.label()))
        })
    }

    /// Sends a correlated request and waits for its reply.
    ///
    /// Fails with `Timeout` once `timeout` elapses, `Cancelled` when `cancel`
    /// fires, `Transport` if the channel closes first, and `Remote` when the
    /// agent replies with `success: false`.
    pub async fn request(
        &self,
        request: Request,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);
        let _guard = PendingGuard { conn: self, id };

        // close() may have drained the table just before our insert
        if self.inner.closed.is_cancelled() {
            return Err(RpcError::Transport(format!(
                "connection to {} is closed",
                self.label()
            )));
        }

        trace!(connection = %self.inner.id, request_id = %id, verb = request.verb(), "sending request");
        self.send(OutboundFrame::Request { id, request })?;

        let deadline = async {
            match timeout {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            reply = rx => {
                let reply = reply.map_err(|_| {
                    RpcError::Transport(format!(
                        "connection to {} closed before reply",
                        self.label()
                    ))
                })?;
                reply.into_result().map_err(RpcError::Remote)
            }
            _ = deadline => Err(RpcError::Timeout {
                agent_id: self.label(),
                // deadline only completes when a timeout is set
                after: timeout.unwrap_or_default(),
            }),
            _ = cancelled => Err(RpcError::Cancelled(self.label())),
        }
    }

    /// Delivers a reply to the request it correlates with.
    ///
    /// Returns false if no request with that id is pending (late or unknown
    /// reply).
    pub fn resolve(&self, id: Uuid, reply: Reply) -> bool {
        let sender = self.lock_pending().remove(&id);
        match sender {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                debug!(connection = %self.inner.id, request_id = %id, "reply for unknown request");
                false
            }
        }
    }

    /// Closes the channel. Every pending request fails with `Transport`.
    pub fn close(&self) {
        self.inner.closed.cancel();
        let drained: Vec<_> = self.lock_pending().drain().collect();
        if !drained.is_empty() {
            debug!(
                connection = %self.inner.id,
                pending = drained.len(),
                "closing connection with pending requests"
            );
        }
    }
}
