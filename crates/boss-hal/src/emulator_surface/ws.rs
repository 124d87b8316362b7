// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws` — streams one JSON message per hardware/input event. The first
//! message after connection is always an `initial_state` snapshot (spec
//! §4.9); reconnects are treated as fresh sessions.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use super::state::EmulatorSurfaceState;

pub async fn ws_handler(
    State(state): State<Arc<EmulatorSurfaceState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<EmulatorSurfaceState>) {
    let client_id = state.next_client_id();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut relay_rx = state.subscribe();

    let initial = serde_json::json!({
        "event": "initial_state",
        "payload": state.initial_state(),
    });
    if let Ok(text) = serde_json::to_string(&initial) {
        if ws_tx.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = relay_rx.recv() => {
                match incoming {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(client_id, skipped, "emulator ws client lagged, dropping");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Inbound control messages (ping/pong/text) are ignored;
                    // hardware edges are driven over the REST endpoints.
                    _ => {}
                }
            }
        }
    }
}
