// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state/logic behind the Mock and Emulator backends — both are pure
//! software, differing only in `kind()` and in who drives their setters (test
//! code for Mock, the HTTP/WS surface for Emulator).

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::event_sink::EventSink;
use crate::types::{
    ButtonId, Color, LedId, LedState, RawButtonEdge, ScreenClearOptions, ScreenContent,
    ScreenText, ScreenTextOptions, SwitchValue,
};

struct Inner {
    switches: SwitchValue,
    leds: [LedState; 4],
    display: Option<SwitchValue>,
    screen: ScreenContent,
}

pub struct SoftBackend {
    inner: RwLock<Inner>,
    sink: Arc<dyn EventSink>,
    source: &'static str,
    buttons_tx: broadcast::Sender<RawButtonEdge>,
    switch_tx: broadcast::Sender<SwitchValue>,
}

impl SoftBackend {
    pub fn new(sink: Arc<dyn EventSink>, source: &'static str) -> Self {
        let (buttons_tx, _) = broadcast::channel(256);
        let (switch_tx, _) = broadcast::channel(256);
        Self {
            inner: RwLock::new(Inner {
                switches: 0,
                leds: [LedState::OFF; 4],
                display: None,
                screen: ScreenContent::Clear {
                    content: (),
                    options: ScreenClearOptions { bg: Color::BLACK },
                },
            }),
            sink,
            source,
            buttons_tx,
            switch_tx,
        }
    }

    pub fn set_switches(&self, value: SwitchValue) {
        self.inner.write().switches = value;
        let _ = self.switch_tx.send(value);
    }

    pub fn press_button(&self, button: ButtonId) {
        self.set_button(button, true);
        self.set_button(button, false);
    }

    pub fn set_button(&self, button: ButtonId, pressed: bool) {
        let _ = self.buttons_tx.send(RawButtonEdge { button, pressed });
    }

    pub fn read_switches(&self) -> SwitchValue {
        self.inner.read().switches
    }

    pub fn set_led(&self, led: LedId, state: LedState) {
        let idx = led as usize;
        let changed = {
            let mut inner = self.inner.write();
            let prev = inner.leds[idx];
            inner.leds[idx] = state;
            prev.on != state.on || prev.brightness != state.brightness
        };
        if changed {
            self.sink.publish(
                "output.led.state_changed",
                serde_json::json!({
                    "color": led.as_str(),
                    "is_on": state.on,
                    "brightness": state.brightness,
                }),
                self.source,
            );
        }
    }

    pub fn led_state(&self, led: LedId) -> LedState {
        self.inner.read().leds[led as usize]
    }

    pub fn set_display(&self, value: Option<SwitchValue>) {
        self.inner.write().display = value;
        self.sink.publish(
            "output.display.updated",
            serde_json::json!({ "value": value }),
            self.source,
        );
    }

    pub fn display_value(&self) -> Option<SwitchValue> {
        self.inner.read().display
    }

    pub fn draw_text(&self, text: ScreenText) {
        let content = ScreenContent::Text {
            content: text.content,
            options: ScreenTextOptions {
                font_size: text.font_size,
                fg: text.fg,
                bg: text.bg,
                align: text.align,
            },
        };
        self.inner.write().screen = content.clone();
        self.sink.publish(
            "output.screen.updated",
            serde_json::to_value(&content).unwrap_or_default(),
            self.source,
        );
    }

    pub fn clear_screen(&self, bg: Color) {
        let content = ScreenContent::Clear { content: (), options: ScreenClearOptions { bg } };
        self.inner.write().screen = content.clone();
        self.sink.publish(
            "output.screen.updated",
            serde_json::to_value(&content).unwrap_or_default(),
            self.source,
        );
    }

    pub fn screen_content(&self) -> ScreenContent {
        self.inner.read().screen.clone()
    }

    pub fn subscribe_buttons(&self) -> broadcast::Receiver<RawButtonEdge> {
        self.buttons_tx.subscribe()
    }

    pub fn subscribe_switch_edge(&self) -> broadcast::Receiver<SwitchValue> {
        self.switch_tx.subscribe()
    }
}
