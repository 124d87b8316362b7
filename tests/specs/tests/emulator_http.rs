// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface tests for the Emulator debug API (spec §4.9), built
//! directly against `boss_hal::emulator_surface::build_router` the same way
//! a real deployment wires it — without going through the full orchestrator.

use std::sync::Arc;

use axum::http::StatusCode;
use boss_hal::emulator_surface::build_router;
use boss_hal::{ButtonId, EmulatorBackend, EventSink, HardwareBackend, LedId};

struct NullSink;
impl EventSink for NullSink {
    fn publish(&self, _event_type: &'static str, _payload: serde_json::Value, _source: &str) {}
}

fn test_backend() -> Arc<EmulatorBackend> {
    EmulatorBackend::new(Arc::new(NullSink))
}

#[tokio::test]
async fn get_state_reflects_backend_defaults() {
    let backend = test_backend();
    let (app, _state) = build_router(backend);
    let server = axum_test::TestServer::new(app).expect("create test server");

    let resp = server.get("/api/state").await;
    resp.assert_status(StatusCode::OK);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["switch_value"], 0);
    assert_eq!(body["display"], serde_json::Value::Null);
    assert_eq!(body["leds"].as_array().map(|a| a.len()), Some(4));
}

#[tokio::test]
async fn put_switches_updates_state() {
    let backend = test_backend();
    let (app, _state) = build_router(backend.clone());
    let server = axum_test::TestServer::new(app).expect("create test server");

    let resp = server.put("/api/switches").json(&serde_json::json!({"value": 77})).await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(backend.read_switches(), 77);
}

#[tokio::test]
async fn post_button_press_is_a_full_click() {
    let backend = test_backend();
    let (app, _state) = build_router(backend.clone());
    let server = axum_test::TestServer::new(app).expect("create test server");

    let mut edges = backend.subscribe_buttons();
    let resp = server.post("/api/buttons/go").await;
    resp.assert_status(StatusCode::OK);

    let first = edges.recv().await.expect("press edge");
    assert_eq!(first.button, ButtonId::Go);
    assert!(first.pressed);
    let second = edges.recv().await.expect("release edge");
    assert!(!second.pressed);
}

#[tokio::test]
async fn post_button_unknown_id_is_bad_request() {
    let backend = test_backend();
    let (app, _state) = build_router(backend);
    let server = axum_test::TestServer::new(app).expect("create test server");

    let resp = server.post("/api/buttons/purple").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_led_bypasses_the_gate() {
    let backend = test_backend();
    let (app, _state) = build_router(backend.clone());
    let server = axum_test::TestServer::new(app).expect("create test server");

    let resp = server.put("/api/leds/red").json(&serde_json::json!({"on": true, "brightness": 0.5})).await;
    resp.assert_status(StatusCode::OK);
    let state = backend.led_state(LedId::Red);
    assert!(state.on);
    assert_eq!(state.brightness, 0.5);
}

#[tokio::test]
async fn screen_clear_then_text_roundtrip_through_state() {
    let backend = test_backend();
    let (app, _state) = build_router(backend);
    let server = axum_test::TestServer::new(app).expect("create test server");

    server.post("/api/screen/clear").await.assert_status(StatusCode::OK);
    server
        .put("/api/screen/text")
        .json(&serde_json::json!({"text": "hello", "font_size": 32}))
        .await
        .assert_status(StatusCode::OK);

    let resp = server.get("/api/state").await;
    let body: serde_json::Value = resp.json();
    assert_eq!(body["screen"]["content"], "hello");
}

#[tokio::test]
async fn unknown_path_falls_through_to_static_assets_and_404s() {
    let backend = test_backend();
    let (app, _state) = build_router(backend);
    let server = axum_test::TestServer::new(app).expect("create test server");

    let resp = server.get("/this-path-does-not-exist.txt").await;
    resp.assert_status(StatusCode::NOT_FOUND);
}
