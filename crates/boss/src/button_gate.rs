// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Button/LED Gate (C4, spec §4.4): republishes raw button edges as
//! `input.button.pressed`/`input.button.released`, gated on the paired LED's
//! `on` state for color buttons. The Go button is never gated.

use std::sync::Arc;

use boss_hal::{ButtonId, HardwareBackend};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bus::EventBus;

/// Spawns the task forwarding gated button edges onto the bus. Runs until
/// `shutdown` fires.
pub fn spawn(hal: Arc<dyn HardwareBackend>, bus: Arc<EventBus>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut edges = hal.subscribe_buttons();
        loop {
            let edge = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = edges.recv() => match result {
                    Ok(edge) => edge,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            };

            let gated = match edge.button.paired_led() {
                Some(led) => !hal.led_state(led).on,
                None => false,
            };

            if gated {
                info!(button = %edge.button, pressed = edge.pressed, "button edge ignored: led is off");
                continue;
            }

            let event_type = if edge.pressed { "input.button.pressed" } else { "input.button.released" };
            bus.publish(
                event_type,
                serde_json::json!({"button": edge.button.as_str()}),
                "button_gate",
            );
        }
    });
}

#[cfg(test)]
#[path = "button_gate_tests.rs"]
mod tests;
