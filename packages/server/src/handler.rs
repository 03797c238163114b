//! WebSocket and HTTP handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use gavel_shared::protocol::{ClientMessage, JoinedAuctionData, ServerMessage};

use crate::registry::{ConnectionId, RegistryStats};
use crate::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // The outbound channel is registered before the upgrade completes so a
    // broadcast arriving mid-handshake is queued, not lost. The registry
    // keeps the only sender: unregistering (disconnect or heartbeat
    // eviction) closes the channel, which ends the send task below and
    // tears the socket down.
    let (tx, rx) = mpsc::unbounded_channel();
    let conn_id = state.registry.register(tx, state.clock.now_millis()).await;

    tracing::info!("Connection {} accepted", conn_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, conn_id, rx))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    conn_id: ConnectionId,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Acknowledge the open channel before anything else.
    let greeting = serde_json::to_string(&ServerMessage::Connected).unwrap();
    if let Err(e) = sender.send(Message::Text(greeting.into())).await {
        tracing::warn!("Failed to greet connection {}: {}", conn_id, e);
        state.registry.unregister(conn_id).await;
        return;
    }

    let state_for_recv = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("WebSocket read error on {}: {}", conn_id, e);
                    break;
                }
            };

            match frame {
                Message::Text(text) => {
                    handle_client_frame(&state_for_recv, conn_id, &text).await;
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", conn_id);
                    break;
                }
                // Protocol-level ping/pong is handled by the transport; the
                // application heartbeat is the JSON `ping` envelope.
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // If either task completes, abort the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Destruction synchronously removes the connection from any room.
    state.registry.unregister(conn_id).await;
    tracing::info!("Connection {} closed", conn_id);
}

/// Apply one inbound frame. Malformed or unknown frames are logged and
/// dropped; the connection stays alive. Replies travel through the same
/// outbound channel broadcasts use, preserving per-connection frame order.
/// Frames from a connection the registry no longer knows (already evicted)
/// are ignored; its socket is mid-teardown.
async fn handle_client_frame(state: &Arc<AppState>, conn_id: ConnectionId, text: &str) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Discarding unparseable frame from {}: {}", conn_id, e);
            return;
        }
    };

    match msg {
        ClientMessage::IdentifyUser { user_id } => {
            state.registry.identify(conn_id, user_id).await;
        }
        ClientMessage::JoinAuction {
            listing_id,
            user_id,
        } => {
            if let Some(user_id) = user_id {
                state.registry.identify(conn_id, user_id).await;
            }
            let now = state.clock.now_millis();
            if let Some(participant_count) = state.registry.join(conn_id, listing_id, now).await {
                reply(
                    state,
                    conn_id,
                    &ServerMessage::JoinedAuction {
                        listing_id,
                        data: JoinedAuctionData { participant_count },
                    },
                )
                .await;
            }
        }
        ClientMessage::LeaveAuction => {
            state.registry.leave(conn_id).await;
        }
        ClientMessage::Ping => {
            // A ping from an evicted connection is not acknowledged; the
            // stalled client must observe the close and reconnect.
            if state
                .registry
                .touch_heartbeat(conn_id, state.clock.now_millis())
                .await
            {
                reply(state, conn_id, &ServerMessage::Pong).await;
            } else {
                tracing::debug!("Ping from evicted connection {} ignored", conn_id);
            }
        }
    }
}

async fn reply(state: &Arc<AppState>, conn_id: ConnectionId, msg: &ServerMessage) {
    let frame = serde_json::to_string(msg).unwrap();
    if !state.registry.send_to(conn_id, frame).await {
        // The connection is gone; teardown in handle_socket will finish up.
        tracing::debug!("Reply to {} dropped, connection closed", conn_id);
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Live counters: connections, rooms, hot auctions.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<RegistryStats> {
    Json(state.registry.stats().await)
}
