// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[cfg(feature = "gpio")]
pub mod gpio;
pub mod emulator;
pub mod mock;
mod soft;

use tokio::sync::broadcast;

use crate::types::{
    Color, HardwareBackendKind, LedId, LedState, RawButtonEdge, ScreenContent, ScreenText,
    SwitchValue,
};

/// The single contract all three backends implement (spec §4.1). Every
/// method must behave identically across backends apart from the mechanism
/// used to talk to the underlying device — the "parity rule".
pub trait HardwareBackend: Send + Sync {
    fn kind(&self) -> HardwareBackendKind;

    /// Atomic read of the current 8-bit switch value.
    fn read_switches(&self) -> SwitchValue;

    /// Idempotent; emits `output.led.state_changed` on any transition.
    fn set_led(&self, led: LedId, state: LedState);

    /// Last commanded state for `led`.
    fn led_state(&self, led: LedId) -> LedState;

    /// Writes the 7-seg display. `None` blanks it. Emits `output.display.updated`.
    fn set_display(&self, value: Option<SwitchValue>);

    /// Last value written via `set_display`.
    fn display_value(&self) -> Option<SwitchValue>;

    /// Draws text on the main screen. Emits `output.screen.updated`.
    fn draw_text(&self, text: ScreenText);

    /// Clears the main screen to `bg`. Emits `output.screen.updated`.
    fn clear_screen(&self, bg: Color);

    /// What the main screen currently shows.
    fn screen_content(&self) -> ScreenContent;

    /// Raw, undebounced button edges. Debouncing/gating lives in C3/C4.
    fn subscribe_buttons(&self) -> broadcast::Receiver<RawButtonEdge>;

    /// Raw switch-value edges, for backends able to report them directly
    /// (interrupt-driven GPIO, the emulator). C3 polls `read_switches`
    /// instead of relying on this for its committed-value logic; this
    /// exists for observers (e.g. the emulator's raw-state relay) that want
    /// every edge, debounced or not.
    fn subscribe_switch_edge(&self) -> broadcast::Receiver<SwitchValue>;

    /// Narrows a trait object back to its concrete backend. Used by
    /// integration tests driving hardware edges through `Arc<dyn
    /// HardwareBackend>` without the orchestrator exposing backend-specific
    /// types on its own public surface.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Pin assignments for the real GPIO backend, taken from `hardware.pins` in
/// the config file (spec §6).
#[derive(Debug, Clone)]
pub struct GpioPins {
    pub button_red: u8,
    pub button_yellow: u8,
    pub button_green: u8,
    pub button_blue: u8,
    pub button_go: u8,
    pub led_red: u8,
    pub led_yellow: u8,
    pub led_green: u8,
    pub led_blue: u8,
    pub mux_select: [u8; 3],
    pub mux_common_input: u8,
    pub display_data: u8,
    pub display_clock: u8,
}
