// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend driven entirely by the HTTP/WebSocket emulator surface (spec
//! §4.1, §4.9). No physical I/O — method calls simulate hardware edges and
//! state changes the same way [`super::mock::MockBackend`] does; the only
//! difference is who calls the setters (inbound HTTP handlers here, test
//! code there) and the reported [`HardwareBackendKind`].

use std::sync::Arc;

use tokio::sync::broadcast;

use super::soft::SoftBackend;
use super::HardwareBackend;
use crate::event_sink::EventSink;
use crate::types::{
    ButtonId, Color, HardwareBackendKind, LedId, LedState, RawButtonEdge, ScreenContent,
    ScreenText, SwitchValue,
};

pub struct EmulatorBackend {
    soft: SoftBackend,
}

impl EmulatorBackend {
    pub fn new(sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self { soft: SoftBackend::new(sink, "hal:emulator") })
    }

    /// Simulate the switch multiplexer being dialed to `value` (driven by
    /// `PUT /api/switches`).
    pub fn set_switches(&self, value: SwitchValue) {
        self.soft.set_switches(value);
    }

    /// Simulate a press/release edge (driven by `POST /api/buttons/{id}`).
    pub fn set_button(&self, button: ButtonId, pressed: bool) {
        self.soft.set_button(button, pressed);
    }

    pub fn press_button(&self, button: ButtonId) {
        self.soft.press_button(button);
    }
}

impl HardwareBackend for EmulatorBackend {
    fn kind(&self) -> HardwareBackendKind {
        HardwareBackendKind::Emulator
    }

    fn read_switches(&self) -> SwitchValue {
        self.soft.read_switches()
    }

    fn set_led(&self, led: LedId, state: LedState) {
        self.soft.set_led(led, state);
    }

    fn led_state(&self, led: LedId) -> LedState {
        self.soft.led_state(led)
    }

    fn set_display(&self, value: Option<SwitchValue>) {
        self.soft.set_display(value);
    }

    fn display_value(&self) -> Option<SwitchValue> {
        self.soft.display_value()
    }

    fn draw_text(&self, text: ScreenText) {
        self.soft.draw_text(text);
    }

    fn clear_screen(&self, bg: Color) {
        self.soft.clear_screen(bg);
    }

    fn screen_content(&self) -> ScreenContent {
        self.soft.screen_content()
    }

    fn subscribe_buttons(&self) -> broadcast::Receiver<RawButtonEdge> {
        self.soft.subscribe_buttons()
    }

    fn subscribe_switch_edge(&self) -> broadcast::Receiver<SwitchValue> {
        self.soft.subscribe_switch_edge()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
