// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mini-App API (C7, spec §4.7): the narrow facade handed to a running
//! mini-app. Forbidden operations (raw hardware access, writing the 7-seg
//! display, filesystem writes outside the app's own directory) simply have
//! no corresponding method here — the contract is enforced by the type
//! system, not documentation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use boss_hal::{Color, HardwareBackend, LedId, LedState, ScreenAlign, ScreenText};
use serde_json::Value;
use tracing::{error, info};

use crate::bus::{EventBus, SubscriptionId};
use crate::error::BossError;

/// Screen drawing, bounded to the HAL's text-only contract (spec §9: image
/// support is an optional capability upper layers must degrade gracefully
/// without).
#[derive(Clone)]
pub struct ScreenHandle {
    hal: Arc<dyn HardwareBackend>,
    width: u32,
    height: u32,
}

impl ScreenHandle {
    pub fn display_text(
        &self,
        text: impl Into<String>,
        font_size: Option<u16>,
        fg: Option<Color>,
        bg: Option<Color>,
        align: Option<ScreenAlign>,
    ) {
        self.hal.draw_text(ScreenText {
            content: text.into(),
            font_size: font_size.unwrap_or(24),
            fg: fg.unwrap_or(Color::WHITE),
            bg: bg.unwrap_or(Color::BLACK),
            align: align.unwrap_or(ScreenAlign::Center),
        });
    }

    /// Image rendering is not implemented by any current backend; mini-apps
    /// must treat this as a fallible, optional capability (spec §9).
    pub fn display_image(&self, _path_or_bytes: &str, _scale: Option<f32>, _position: Option<(i32, i32)>) -> Result<(), BossError> {
        Err(BossError::Hardware("image rendering is not supported by this backend".into()))
    }

    pub fn clear_screen(&self, bg: Option<Color>) {
        self.hal.clear_screen(bg.unwrap_or(Color::BLACK));
    }

    pub fn get_screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// LED control, gated at the caller's discretion — the API itself places no
/// restriction beyond what `HardwareBackend::set_led` already enforces.
#[derive(Clone)]
pub struct LedsHandle {
    hal: Arc<dyn HardwareBackend>,
}

impl LedsHandle {
    pub fn set(&self, color: LedId, on: bool, brightness: Option<f32>) {
        let state = if on { LedState::on(brightness.unwrap_or(1.0)) } else { LedState::OFF };
        self.hal.set_led(color, state);
    }

    pub fn state(&self, color: LedId) -> LedState {
        self.hal.led_state(color)
    }
}

/// Event bus access scoped to one app: publishes are stamped `app:<name>`.
#[derive(Clone)]
pub struct EventsHandle {
    bus: Arc<EventBus>,
    source: Arc<str>,
}

impl EventsHandle {
    pub fn subscribe<F>(&self, event_type: impl Into<String>, filter: Option<HashMap<String, Value>>, handler: F) -> SubscriptionId
    where
        F: Fn(&crate::bus::Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(event_type, filter, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    pub fn publish(&self, event_type: impl Into<String>, payload: Value) {
        self.bus.publish(event_type, payload, self.source.to_string());
    }
}

/// Per-`AppRun` facade. Holds a borrowing-style reference to the bus and HAL
/// (via `Arc`) and must not outlive the `AppRun` that created it.
#[derive(Clone)]
pub struct MiniAppApi {
    app_name: Arc<str>,
    assets_dir: PathBuf,
    screen: ScreenHandle,
    leds: LedsHandle,
    events: EventsHandle,
}

impl MiniAppApi {
    pub fn new(
        app_name: impl Into<Arc<str>>,
        assets_dir: PathBuf,
        hal: Arc<dyn HardwareBackend>,
        bus: Arc<EventBus>,
        screen_width: u32,
        screen_height: u32,
    ) -> Self {
        let app_name = app_name.into();
        Self {
            screen: ScreenHandle { hal: Arc::clone(&hal), width: screen_width, height: screen_height },
            leds: LedsHandle { hal },
            events: EventsHandle { bus, source: Arc::from(format!("app:{app_name}")) },
            assets_dir,
            app_name,
        }
    }

    pub fn screen(&self) -> &ScreenHandle {
        &self.screen
    }

    pub fn leds(&self) -> &LedsHandle {
        &self.leds
    }

    pub fn events(&self) -> &EventsHandle {
        &self.events
    }

    pub fn log_info(&self, message: impl AsRef<str>) {
        info!(app = %self.app_name, "{}", message.as_ref());
    }

    pub fn log_error(&self, message: impl AsRef<str>) {
        error!(app = %self.app_name, "{}", message.as_ref());
    }

    /// Resolves `filename` inside this app's own asset directory. Rejects
    /// any path that would escape it (spec §4.7: "attempts to traverse
    /// outside raise an error").
    pub fn asset_path(&self, filename: &str) -> Result<PathBuf, BossError> {
        if Path::new(filename).is_absolute() {
            return Err(BossError::App {
                app: self.app_name.to_string(),
                message: format!("asset path '{filename}' must be relative"),
            });
        }
        let joined = self.assets_dir.join(filename);
        let normalized = normalize(&joined);
        let root = normalize(&self.assets_dir);
        if !normalized.starts_with(&root) {
            return Err(BossError::App {
                app: self.app_name.to_string(),
                message: format!("asset path '{filename}' escapes the app directory"),
            });
        }
        Ok(normalized)
    }

    /// Reads a declared secret from the process environment. Never logged.
    pub fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Lexical `..`/`.` resolution without touching the filesystem (the asset
/// may not exist yet when this is called).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
