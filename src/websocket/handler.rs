use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::state::AppState;
use crate::utils::scope_guard::ScopeGuard;
use crate::websocket::gateway::Attachment;
use crate::ws::faults::FaultKind;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    debug!("New WebSocket connection attempt");
    let max_bytes = app_state.config.max_message_bytes;
    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    let Attachment { conn_id, mut outbound, evicted } = match app_state.gateway.accept() {
        Ok(attachment) => attachment,
        Err(e) => {
            error!("Refusing WebSocket connection: {}", e);
            app_state.faults.record(e.fault_kind());
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!("WebSocket connection established with connection_id: {}", conn_id);

    // Whatever ends this task, the router hears about the disconnect exactly once.
    let router = app_state.router.clone();
    let _disconnect = ScopeGuard::new(move || {
        router.handle_disconnect(conn_id);
        info!("WebSocket connection {} terminated", conn_id);
    });

    let (mut sender, mut receiver) = socket.split();

    // Writer: drain this connection's queue onto the socket, in order.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match serde_json::to_string(&*msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Socket for {} closed while writing", conn_id);
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Reader: one frame at a time, so a sender's events keep their order.
    let router = app_state.router.clone();
    let faults = app_state.faults.clone();
    let read_loop = async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => router.handle_text(conn_id, &text),
                Ok(Message::Binary(data)) => {
                    warn!("Ignoring {} byte binary frame from {}", data.len(), conn_id);
                    faults.record(FaultKind::MalformedFrame);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close", conn_id);
                    break;
                }
                Err(e) => {
                    debug!("Transport error on {}: {}", conn_id, e);
                    break;
                }
            }
        }
    };

    // Wait for the first of: client gone, writer gone, queue evicted.
    tokio::select! {
        _ = read_loop => {},
        _ = &mut send_task => {},
        _ = evicted => warn!("Connection {} evicted: outbound queue overflowed", conn_id),
    };
    send_task.abort();
}
