// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box scenario tests (spec §8, S1-S6), driven against the real
//! `boss` library wired up through `Orchestrator::bootstrap_with_apps` with
//! the Mock HAL backend — the same composition root a real deployment uses,
//! minus the GPIO/Emulator backend choice.

use std::fs;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use boss::api::MiniAppApi;
use boss::apps::{MiniApp, StaticAppRegistry};
use boss::config::Cli;
use boss::Orchestrator;
use boss_hal::{ButtonId, HardwareBackend, MockBackend};
use clap::Parser;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct WaitsForever;

impl MiniApp for WaitsForever {
    fn run(&self, cancel: CancellationToken, _api: MiniAppApi) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            cancel.cancelled().await;
        })
    }
}

fn write_config(dir: &std::path::Path, apps_dir: &std::path::Path) -> std::path::PathBuf {
    let config_path = dir.join("config.json");
    let config = serde_json::json!({
        "hardware": {
            "button_red": 5, "button_yellow": 6, "button_green": 13, "button_blue": 19,
            "button_go": 26, "led_red": 12, "led_yellow": 16, "led_green": 20, "led_blue": 21,
            "mux_select": [2, 3, 4], "mux_common_input": 17,
            "display_data": 27, "display_clock": 22,
            "screen_width": 800, "screen_height": 480, "enable_audio": false
        },
        "system": {
            "apps_directory": apps_dir.to_string_lossy(),
            "log_level": "INFO",
            "log_file": null,
            "event_queue_size": 1000,
            "app_timeout_seconds": 900
        }
    });
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}

fn write_app(apps_dir: &std::path::Path, name: &str, switch_value: u8, timeout_seconds: Option<u64>, behavior: Option<&str>) {
    let dir = apps_dir.join(name);
    fs::create_dir_all(&dir).unwrap();
    let mut manifest = serde_json::json!({
        "name": name,
        "description": "test app",
        "tags": ["utility"],
    });
    if let Some(timeout) = timeout_seconds {
        manifest["timeout_seconds"] = serde_json::json!(timeout);
    }
    if let Some(behavior) = behavior {
        manifest["timeout_behavior"] = serde_json::json!(behavior);
    }
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();

    let mappings_path = apps_dir.join("app_mappings.json");
    let mut mappings = if mappings_path.is_file() {
        serde_json::from_str::<serde_json::Value>(&fs::read_to_string(&mappings_path).unwrap()).unwrap()
    } else {
        serde_json::json!({"app_mappings": {}, "parameters": {}})
    };
    mappings["app_mappings"][switch_value.to_string()] = serde_json::json!(name);
    fs::write(&mappings_path, mappings.to_string()).unwrap();
}

async fn bootstrap_mock(apps_dir: &std::path::Path) -> Orchestrator {
    let config_dir = TempDir::new().unwrap();
    let config_path = write_config(config_dir.path(), apps_dir);
    let cli = Cli::parse_from(["boss", "--config-path", config_path.to_str().unwrap(), "--test-mode"]);

    let mut apps = StaticAppRegistry::new();
    apps.register("waits", std::sync::Arc::new(|| Box::new(WaitsForever) as Box<dyn MiniApp>));

    Orchestrator::bootstrap_with_apps(cli, apps).await.unwrap()
}

fn drive_switches(hal: &std::sync::Arc<dyn HardwareBackend>, value: u8) {
    hal.as_any().downcast_ref::<MockBackend>().expect("mock backend").set_switches(value);
}

fn drive_button(hal: &std::sync::Arc<dyn HardwareBackend>, button: ButtonId) {
    hal.as_any().downcast_ref::<MockBackend>().expect("mock backend").press_button(button);
}

/// **S1. Switch change then Go.** Dial 42, wait past the debounce window,
/// press Go — expect the switch change, the display update, the go press,
/// and the app launch, in that order.
#[tokio::test]
async fn s1_switch_change_then_go() {
    let apps_tmp = TempDir::new().unwrap();
    write_app(apps_tmp.path(), "waits", 42, None, None);
    let orchestrator = bootstrap_mock(apps_tmp.path()).await;
    let hal = orchestrator.hal();
    let mut relay = orchestrator.bus().relay_subscribe();

    drive_switches(hal, 42);
    tokio::time::sleep(Duration::from_millis(80)).await;
    drive_button(hal, ButtonId::Go);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut events = Vec::new();
    while let Ok(event) = relay.try_recv() {
        events.push(event);
    }

    let idx = |needle: &str, key: &str, value: serde_json::Value| {
        events.iter().position(|e| e.event_type == needle && e.payload.get(key) == Some(&value))
    };

    let changed = idx("input.switch.changed", "new_value", serde_json::json!(42)).expect("switch changed");
    let display = idx("output.display.updated", "value", serde_json::json!(42)).expect("display updated");
    let go = idx("input.button.pressed", "button", serde_json::json!("go")).expect("go pressed");
    let started = idx("system.app.started", "app_name", serde_json::json!("waits")).expect("app started");

    assert!(changed < go, "switch change must precede the go press");
    assert!(display < go, "display update must precede the go press");
    assert!(go < started, "go press must precede the app launch");
}

/// **S4. User preemption.** App A running; switches move from 10 to 20 and
/// Go is pressed again — A's stop (`user_stop`) must precede B's start.
#[tokio::test]
async fn s4_user_preemption() {
    let apps_tmp = TempDir::new().unwrap();
    write_app(apps_tmp.path(), "waits", 10, None, None);
    write_app(apps_tmp.path(), "waits", 20, None, None);
    let orchestrator = bootstrap_mock(apps_tmp.path()).await;
    let hal = orchestrator.hal();
    let mut relay = orchestrator.bus().relay_subscribe();

    drive_switches(hal, 10);
    tokio::time::sleep(Duration::from_millis(80)).await;
    drive_button(hal, ButtonId::Go);
    tokio::time::sleep(Duration::from_millis(80)).await;

    drive_switches(hal, 20);
    tokio::time::sleep(Duration::from_millis(80)).await;
    drive_button(hal, ButtonId::Go);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut events = Vec::new();
    while let Ok(event) = relay.try_recv() {
        events.push(event);
    }

    let stop_idx = events
        .iter()
        .position(|e| e.event_type == "system.app.stopped" && e.payload["reason"] == "user_stop")
        .expect("preempted stop");
    let start_idx = events
        .iter()
        .rposition(|e| e.event_type == "system.app.started" && e.payload["switch_value"] == 20)
        .expect("second app started");
    assert!(stop_idx < start_idx);
}

/// **S3. Timeout with `return`.** A 1-second app times out and the runner
/// falls back to the startup app.
#[tokio::test]
async fn s3_timeout_with_return() {
    let apps_tmp = TempDir::new().unwrap();
    write_app(apps_tmp.path(), "waits", 5, Some(1), Some("return"));
    let orchestrator = bootstrap_mock(apps_tmp.path()).await;
    let hal = orchestrator.hal();
    let mut relay = orchestrator.bus().relay_subscribe();

    drive_switches(hal, 5);
    tokio::time::sleep(Duration::from_millis(80)).await;
    drive_button(hal, ButtonId::Go);
    tokio::time::sleep(Duration::from_millis(1300)).await;

    let mut events = Vec::new();
    while let Ok(event) = relay.try_recv() {
        events.push(event);
    }

    assert!(events
        .iter()
        .any(|e| e.event_type == "system.app.stopped" && e.payload["app_name"] == "waits" && e.payload["reason"] == "timeout"));
    assert!(events
        .iter()
        .any(|e| e.event_type == "system.app.started" && e.payload["app_name"] == "startup"));
}

/// **S2. Ungated button press ignored.** No LED is lit; pressing a color
/// button never reaches the bus as `input.button.pressed`.
#[tokio::test]
async fn s2_ungated_button_press_is_ignored() {
    let apps_tmp = TempDir::new().unwrap();
    let orchestrator = bootstrap_mock(apps_tmp.path()).await;
    let hal = orchestrator.hal();
    let mut relay = orchestrator.bus().relay_subscribe();

    drive_button(hal, ButtonId::Red);
    tokio::time::sleep(Duration::from_millis(80)).await;

    let mut saw_press = false;
    while let Ok(event) = relay.try_recv() {
        if event.event_type == "input.button.pressed" {
            saw_press = true;
        }
    }
    assert!(!saw_press);
}

/// **S6. Invalid manifest.** A manifest whose `name` doesn't match its
/// directory is rejected; startup still succeeds and the value resolves
/// to nothing.
#[tokio::test]
async fn s6_invalid_manifest_does_not_fail_startup() {
    let apps_tmp = TempDir::new().unwrap();
    let dir = apps_tmp.path().join("foo");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.json"), r#"{"name":"bar","tags":["content"]}"#).unwrap();
    fs::write(apps_tmp.path().join("app_mappings.json"), r#"{"app_mappings":{"1":"foo"},"parameters":{}}"#).unwrap();

    let orchestrator = bootstrap_mock(apps_tmp.path()).await;
    assert!(orchestrator.registry().resolve(1).is_none());
}
