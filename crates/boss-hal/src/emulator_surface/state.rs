// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::backend::emulator::EmulatorBackend;
use crate::types::{LedId, LedState, ScreenContent, SwitchValue};

/// Bounded per-client relay buffer. A client that falls this far behind gets
/// disconnected rather than allowed to pause event delivery to everyone else.
const RELAY_CAPACITY: usize = 256;

/// Shared state behind every emulator HTTP/WS route.
pub struct EmulatorSurfaceState {
    pub backend: Arc<EmulatorBackend>,
    relay_tx: broadcast::Sender<String>,
    next_client_id: AtomicU64,
}

impl EmulatorSurfaceState {
    pub fn new(backend: Arc<EmulatorBackend>) -> Arc<Self> {
        let (relay_tx, _) = broadcast::channel(RELAY_CAPACITY);
        Arc::new(Self { backend, relay_tx, next_client_id: AtomicU64::new(1) })
    }

    /// Forward one bus event to every connected WebSocket client. Called by
    /// the orchestrator's relay task, never by HAL code directly (the
    /// emulator surface only *observes* the bus; it never owns it).
    pub fn relay_event(&self, event: &str, payload: serde_json::Value, timestamp_ms: u64) {
        let message = serde_json::json!({
            "event": event,
            "payload": payload,
            "timestamp": timestamp_ms,
        });
        if let Ok(text) = serde_json::to_string(&message) {
            let _ = self.relay_tx.send(text);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.relay_tx.subscribe()
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of current LEDs, display content, screen content, and switch
    /// value — sent as the first WS message after every connection (spec §4.9:
    /// "reconnects are fresh sessions and resend `initial_state`").
    pub fn initial_state(&self) -> InitialState {
        let leds: Vec<LedSnapshot> = LedId::ALL
            .into_iter()
            .map(|id| LedSnapshot { color: id.as_str(), state: self.backend.led_state(id) })
            .collect();
        InitialState {
            switch_value: self.backend.read_switches(),
            leds,
            display: self.backend.display_value(),
            screen: self.backend.screen_content(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedSnapshot {
    pub color: &'static str,
    #[serde(flatten)]
    pub state: LedState,
}

#[derive(Debug, Serialize)]
pub struct InitialState {
    pub switch_value: SwitchValue,
    pub leds: Vec<LedSnapshot>,
    pub display: Option<SwitchValue>,
    pub screen: ScreenContent,
}
