// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST endpoints for driving hardware edges on the Emulator backend
//! (spec §4.9): press/release per button, set switch value, set LED (test
//! mode), set/clear display and screen text.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::EmulatorSurfaceState;
use crate::types::{ButtonId, Color, LedId, ScreenText, SwitchValue};

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self { status: "ok", error: None }
    }

    fn error(message: impl Into<String>) -> Self {
        Self { status: "error", error: Some(message.into()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct ButtonRequest {
    /// Defaults to a full press-then-release when omitted.
    #[serde(default)]
    pub pressed: Option<bool>,
}

/// `POST /api/buttons/{id}` — simulate a button edge or a full click.
pub async fn press_button(
    State(state): State<Arc<EmulatorSurfaceState>>,
    Path(id): Path<String>,
    body: Option<Json<ButtonRequest>>,
) -> impl IntoResponse {
    let Some(button) = ButtonId::parse(&id) else {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(format!("unknown button {id}"))));
    };
    match body.and_then(|Json(b)| b.pressed) {
        Some(pressed) => state.backend.set_button(button, pressed),
        None => state.backend.press_button(button),
    }
    (StatusCode::OK, Json(ApiResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub value: SwitchValue,
}

/// `PUT /api/switches` — set the 8-bit switch value (0-255).
pub async fn set_switches(
    State(state): State<Arc<EmulatorSurfaceState>>,
    Json(req): Json<SwitchRequest>,
) -> impl IntoResponse {
    state.backend.set_switches(req.value);
    (StatusCode::OK, Json(ApiResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct LedRequest {
    pub on: bool,
    #[serde(default = "default_brightness")]
    pub brightness: f32,
}

fn default_brightness() -> f32 {
    1.0
}

/// `PUT /api/leds/{id}` — test-mode direct LED control (bypasses the app
/// that would normally own it; for exercising the emulator UI).
pub async fn set_led(
    State(state): State<Arc<EmulatorSurfaceState>>,
    Path(id): Path<String>,
    Json(req): Json<LedRequest>,
) -> impl IntoResponse {
    let led = match id.as_str() {
        "red" => LedId::Red,
        "yellow" => LedId::Yellow,
        "green" => LedId::Green,
        "blue" => LedId::Blue,
        _ => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(format!("unknown led {id}"))))
        }
    };
    let commanded = if req.on {
        crate::types::LedState::on(req.brightness)
    } else {
        crate::types::LedState::OFF
    };
    state.backend.set_led(led, commanded);
    (StatusCode::OK, Json(ApiResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct DisplayRequest {
    pub value: Option<SwitchValue>,
}

/// `PUT /api/display` — set (or, with `value: null`, blank) the 7-seg display.
pub async fn set_display(
    State(state): State<Arc<EmulatorSurfaceState>>,
    Json(req): Json<DisplayRequest>,
) -> impl IntoResponse {
    state.backend.set_display(req.value);
    (StatusCode::OK, Json(ApiResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct ScreenTextRequest {
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
}

fn default_font_size() -> u16 {
    24
}

/// `PUT /api/screen/text` — set the main screen's text content.
pub async fn set_screen_text(
    State(state): State<Arc<EmulatorSurfaceState>>,
    Json(req): Json<ScreenTextRequest>,
) -> impl IntoResponse {
    let mut text = ScreenText::simple(req.text);
    text.font_size = req.font_size;
    state.backend.draw_text(text);
    (StatusCode::OK, Json(ApiResponse::ok()))
}

/// `POST /api/screen/clear` — clear the main screen.
pub async fn clear_screen(State(state): State<Arc<EmulatorSurfaceState>>) -> impl IntoResponse {
    state.backend.clear_screen(Color::BLACK);
    (StatusCode::OK, Json(ApiResponse::ok()))
}

/// `GET /api/state` — one-shot snapshot, same shape as the WS `initial_state`.
pub async fn get_state(State(state): State<Arc<EmulatorSurfaceState>>) -> impl IntoResponse {
    Json(state.initial_state())
}
