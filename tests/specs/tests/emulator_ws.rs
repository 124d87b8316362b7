// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket integration tests against the real Emulator debug surface (spec
//! §4.9): real TCP connections through `tokio_tungstenite`, driving hardware
//! edges over `reqwest` against the REST endpoints on the side.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use boss_hal::emulator_surface::build_router;
use boss_hal::{EmulatorBackend, EventSink};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsTx = futures_util::stream::SplitSink<WsStream, WsMessage>;
type WsRx = futures_util::stream::SplitStream<WsStream>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct NullSink;
impl EventSink for NullSink {
    fn publish(&self, _event_type: &'static str, _payload: serde_json::Value, _source: &str) {}
}

/// Spawns the emulator surface on an ephemeral loopback port and returns the
/// address plus the backend it's wired to (so a test can drive hardware
/// edges directly without a full orchestrator).
async fn spawn_surface() -> anyhow::Result<(SocketAddr, Arc<EmulatorBackend>)> {
    let backend = EmulatorBackend::new(Arc::new(NullSink));
    let (router, _state) = build_router(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, backend))
}

async fn ws_connect(addr: SocketAddr) -> anyhow::Result<(WsTx, WsRx)> {
    let url = format!("ws://{addr}/ws");
    let (stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .map_err(|e| anyhow::anyhow!("ws connect: {e}"))?;
    Ok(stream.split())
}

async fn ws_recv(rx: &mut WsRx) -> anyhow::Result<serde_json::Value> {
    let msg = tokio::time::timeout(RECV_TIMEOUT, rx.next())
        .await
        .map_err(|_| anyhow::anyhow!("ws recv timeout"))?
        .ok_or_else(|| anyhow::anyhow!("ws stream closed"))?
        .map_err(|e| anyhow::anyhow!("ws recv: {e}"))?;
    match msg {
        WsMessage::Text(text) => Ok(serde_json::from_str(&text)?),
        other => anyhow::bail!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn first_message_is_an_initial_state_snapshot() -> anyhow::Result<()> {
    let (addr, backend) = spawn_surface().await?;
    backend.set_switches(200);

    let (_tx, mut rx) = ws_connect(addr).await?;
    let first = ws_recv(&mut rx).await?;

    assert_eq!(first["event"], "initial_state");
    assert_eq!(first["payload"]["switch_value"], 200);
    assert_eq!(first["payload"]["leds"].as_array().map(|a| a.len()), Some(4));
    Ok(())
}

#[tokio::test]
async fn reconnects_are_fresh_sessions_each_resending_initial_state() -> anyhow::Result<()> {
    let (addr, backend) = spawn_surface().await?;

    let (tx1, mut rx1) = ws_connect(addr).await?;
    let first = ws_recv(&mut rx1).await?;
    assert_eq!(first["event"], "initial_state");
    drop(tx1);
    drop(rx1);

    backend.set_switches(9);
    let (_tx2, mut rx2) = ws_connect(addr).await?;
    let second = ws_recv(&mut rx2).await?;
    assert_eq!(second["event"], "initial_state");
    assert_eq!(second["payload"]["switch_value"], 9);
    Ok(())
}

#[tokio::test]
async fn rest_driven_switch_value_is_visible_through_the_state_endpoint() -> anyhow::Result<()> {
    let (addr, _backend) = spawn_surface().await?;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("http://{addr}/api/switches"))
        .json(&serde_json::json!({"value": 142}))
        .send()
        .await?;
    assert!(resp.status().is_success());

    let state: serde_json::Value =
        client.get(format!("http://{addr}/api/state")).send().await?.json().await?;
    assert_eq!(state["switch_value"], 142);
    Ok(())
}

#[tokio::test]
async fn multiple_clients_each_get_their_own_initial_state() -> anyhow::Result<()> {
    let (addr, backend) = spawn_surface().await?;
    backend.set_switches(5);

    let (_tx_a, mut rx_a) = ws_connect(addr).await?;
    let (_tx_b, mut rx_b) = ws_connect(addr).await?;

    let a = ws_recv(&mut rx_a).await?;
    let b = ws_recv(&mut rx_b).await?;
    assert_eq!(a["payload"]["switch_value"], 5);
    assert_eq!(b["payload"]["switch_value"], 5);
    Ok(())
}
