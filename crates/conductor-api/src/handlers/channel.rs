//! Duplex channel agents dial back to.
//!
//! Each WebSocket becomes one [`Connection`]. Outbound frames queued on the
//! connection are written as JSON text; inbound text frames are parsed and
//! handed to the RPC layer. When either side goes away the registry is told,
//! which fails every call still waiting on this channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use conductor_models::InboundFrame;
use conductor_rpc::Connection;

use crate::state::AppState;

/// GET /agents/connect - Upgrade to an agent duplex channel.
pub async fn agent_channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_agent(socket, state))
}

async fn serve_agent(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = Connection::new();
    debug!(connection = %conn.id(), "agent channel opened");

    let writer = conn.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(connection = %writer.id(), error = %e, "failed to encode frame");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        debug!(connection = %writer.id(), error = %e, "agent channel write failed");
                        break;
                    }
                }
                _ = writer.closed() => break,
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_text(&state, &conn, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection = %conn.id(), error = %e, "agent channel read failed");
                    break;
                }
            },
            _ = conn.closed() => break,
        }
    }

    if let Some(agent_id) = state.registry().on_disconnect(&conn).await {
        if state.supervisor.is_running(&agent_id).await {
            warn!(
                agent_id = %agent_id,
                "agent disconnected but its process is still running"
            );
        }
    }
    let _ = send_task.await;
    info!(connection = %conn.id(), agent_id = ?conn.agent_id(), "agent channel closed");
}

/// Parses one text frame and dispatches it. Bad frames are logged and
/// dropped; the channel stays open.
pub(crate) async fn handle_text(state: &AppState, conn: &Connection, text: &str) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(connection = %conn.id(), error = %e, "malformed frame from agent");
            return;
        }
    };

    if let Err(e) = state.rpc.handle_inbound(conn, frame).await {
        warn!(
            connection = %conn.id(),
            agent_id = ?conn.agent_id(),
            error = %e,
            "rejected frame from agent"
        );
    }
}
