//! WebSocket handler for real-time client communication.
//!
//! Each connection receives a `snapshot` event followed by every delta in
//! order. Inbound text frames carry commands (see [`crate::actions`]).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;

use crate::api::AppState;
use crate::error::HubError;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Main WebSocket connection handler.
async fn handle_ws(socket: WebSocket, state: AppState) {
    // Register connection for fan-out and force-close capability
    let registered = state.hub().and_then(|hub| hub.connect());
    let (conn_guard, mut outbound) = match registered {
        Ok(registered) => registered,
        Err(HubError::Unavailable) => {
            log::debug!("[WS] Hub deactivated during upgrade, dropping connection");
            return;
        }
        Err(e) => {
            log::warn!("[WS] Failed to build initial snapshot: {}", e);
            return;
        }
    };
    // Only a weak handle is kept for the lifetime of the connection.
    let hub = state.weak_hub();
    let cancel_token = conn_guard.cancel_token().clone();
    let (mut sender, mut receiver) = socket.split();

    log::info!("[WS] New connection established: {}", conn_guard.id());

    loop {
        tokio::select! {
            // Handle force-close request
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Connection force-closed: {}", conn_guard.id());
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            // Handle incoming commands from the client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str().trim().is_empty() {
                            log::debug!("[WS] Ignoring empty frame from {}", conn_guard.id());
                        } else if let Some(hub) = hub.upgrade() {
                            hub.handle_text(text.as_str());
                        } else {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        log::debug!(
                            "[WS] Ignoring {}-byte binary frame from {}",
                            data.len(),
                            conn_guard.id()
                        );
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Forward queued events
            event = outbound.recv() => {
                let Some(text) = event else { break };
                if sender.send(Message::Text(text.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    log::info!("[WS] Connection closed: {}", conn_guard.id());
}
