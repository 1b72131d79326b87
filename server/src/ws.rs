use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;

/// Upgrades to a WebSocket that streams progress events as JSON text frames.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let broadcaster = state.engine.broadcaster().clone();
    let (listener_id, mut rx) = broadcaster.subscribe_channel();
    tracing::info!(listener = ?listener_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize progress event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(listener = ?listener_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    broadcaster.unsubscribe(listener_id);
    send_task.abort();
    tracing::info!(listener = ?listener_id, "WebSocket disconnected");
}
