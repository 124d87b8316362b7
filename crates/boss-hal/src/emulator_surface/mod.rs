// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Emulator's HTTP + WebSocket debug surface (spec §4.9). Bound to
//! loopback only, active only when the Emulator backend is selected.

mod http;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use state::EmulatorSurfaceState;

use crate::backend::emulator::EmulatorBackend;

/// Default bind address for the emulator surface (`hardware.emulator_port`,
/// defaults to 8070 per spec §4.9).
pub fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8070".parse().unwrap_or_else(|_| unreachable!())
}

/// Directory of static control-panel assets, served relative to the crate
/// root (kept out of the read-only example pack at `demos/emulator-ui`).
fn assets_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/emulator-ui")
}

/// Build the axum `Router` for the emulator surface, wired to `backend`.
pub fn build_router(backend: Arc<EmulatorBackend>) -> (Router, Arc<EmulatorSurfaceState>) {
    let state = EmulatorSurfaceState::new(backend);
    let router = Router::new()
        .route("/api/state", get(http::get_state))
        .route("/api/buttons/{id}", post(http::press_button))
        .route("/api/switches", put(http::set_switches))
        .route("/api/leds/{id}", put(http::set_led))
        .route("/api/display", put(http::set_display))
        .route("/api/screen/text", put(http::set_screen_text))
        .route("/api/screen/clear", post(http::clear_screen))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(assets_dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());
    (router, state)
}
