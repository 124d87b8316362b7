// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real GPIO backend. Cycles the 3 multiplexer select pins and samples the
//! shared input line to read all 8 switches through one physical pin, reads
//! four button inputs directly, drives four LED outputs, and writes the
//! 7-seg display over a two-wire (data/clock) shift-register interface.
//!
//! The main screen has no physical backend here — a headless GPIO box has no
//! display controller wired up in the reference hardware, so `draw_text` and
//! `clear_screen` only update the in-memory [`ScreenContent`] snapshot and
//! publish `output.screen.updated`; nothing downstream reads it, which
//! matches spec §9's "a single text-oriented backend... mini-apps should
//! degrade gracefully" note for the case where no physical screen exists.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use tokio::sync::broadcast;

use super::{GpioPins, HardwareBackend};
use crate::error::HardwareError;
use crate::event_sink::EventSink;
use crate::types::{
    ButtonId, Color, HardwareBackendKind, LedId, LedState, RawButtonEdge, ScreenClearOptions,
    ScreenContent, ScreenText, ScreenTextOptions, SwitchValue,
};

/// How long a raw edge must hold before it's forwarded (spec §4.1's
/// recommended ~20ms coalescing window, applied at the source).
const EDGE_DEBOUNCE: Duration = Duration::from_millis(20);

struct Pins {
    button_red: InputPin,
    button_yellow: InputPin,
    button_green: InputPin,
    button_blue: InputPin,
    button_go: InputPin,
    led_red: OutputPin,
    led_yellow: OutputPin,
    led_green: OutputPin,
    led_blue: OutputPin,
    mux_select: [OutputPin; 3],
    mux_common: InputPin,
    display_data: OutputPin,
    display_clock: OutputPin,
}

pub struct GpioBackend {
    pins: Mutex<Pins>,
    leds: Mutex<[LedState; 4]>,
    display: Mutex<Option<SwitchValue>>,
    screen: Mutex<ScreenContent>,
    sink: Arc<dyn EventSink>,
    buttons_tx: broadcast::Sender<RawButtonEdge>,
    switch_tx: broadcast::Sender<SwitchValue>,
}

impl GpioBackend {
    pub fn new(pins: GpioPins, sink: Arc<dyn EventSink>) -> Result<Arc<Self>, HardwareError> {
        let gpio = Gpio::new().map_err(|e| HardwareError::new("gpio", e.to_string()))?;
        let get_input = |n: u8| -> Result<InputPin, HardwareError> {
            gpio.get(n).map(|p| p.into_input_pullup()).map_err(|e| {
                HardwareError::new("gpio", format!("pin {n} as input: {e}"))
            })
        };
        let get_output = |n: u8| -> Result<OutputPin, HardwareError> {
            gpio.get(n).map(|p| p.into_output_low()).map_err(|e| {
                HardwareError::new("gpio", format!("pin {n} as output: {e}"))
            })
        };

        let resolved = Pins {
            button_red: get_input(pins.button_red)?,
            button_yellow: get_input(pins.button_yellow)?,
            button_green: get_input(pins.button_green)?,
            button_blue: get_input(pins.button_blue)?,
            button_go: get_input(pins.button_go)?,
            led_red: get_output(pins.led_red)?,
            led_yellow: get_output(pins.led_yellow)?,
            led_green: get_output(pins.led_green)?,
            led_blue: get_output(pins.led_blue)?,
            mux_select: [
                get_output(pins.mux_select[0])?,
                get_output(pins.mux_select[1])?,
                get_output(pins.mux_select[2])?,
            ],
            mux_common: get_input(pins.mux_common_input)?,
            display_data: get_output(pins.display_data)?,
            display_clock: get_output(pins.display_clock)?,
        };

        let (buttons_tx, _) = broadcast::channel(256);
        let (switch_tx, _) = broadcast::channel(256);
        let backend = Arc::new(Self {
            pins: Mutex::new(resolved),
            leds: Mutex::new([LedState::OFF; 4]),
            display: Mutex::new(None),
            screen: Mutex::new(ScreenContent::Clear {
                content: (),
                options: ScreenClearOptions { bg: Color::BLACK },
            }),
            sink,
            buttons_tx,
            switch_tx,
        });

        backend.clone().spawn_poll_loop();
        Ok(backend)
    }

    /// Background task: samples the multiplexer and button pins on a short
    /// cadence, coalescing transitions shorter than [`EDGE_DEBOUNCE`] at the
    /// source, then republishes stable edges on the broadcast channels that
    /// `subscribe_buttons`/`subscribe_switch_edge` expose.
    fn spawn_poll_loop(self: Arc<Self>) {
        tokio::task::spawn_blocking(move || {
            let mut last_switches = self.sample_switches();
            let mut last_buttons = self.sample_buttons();
            let mut stable_since = std::time::Instant::now();
            loop {
                std::thread::sleep(Duration::from_millis(5));
                let switches = self.sample_switches();
                let buttons = self.sample_buttons();

                if switches != last_switches || buttons != last_buttons {
                    stable_since = std::time::Instant::now();
                    last_switches = switches;
                    last_buttons = buttons;
                    continue;
                }
                if stable_since.elapsed() < EDGE_DEBOUNCE {
                    continue;
                }

                let _ = self.switch_tx.send(switches);
                for (id, level) in [
                    (ButtonId::Red, buttons[0]),
                    (ButtonId::Yellow, buttons[1]),
                    (ButtonId::Green, buttons[2]),
                    (ButtonId::Blue, buttons[3]),
                    (ButtonId::Go, buttons[4]),
                ] {
                    let _ = self.buttons_tx.send(RawButtonEdge { button: id, pressed: level });
                }
            }
        });
    }

    /// Cycle the 3 select lines through all 8 combinations, sampling the
    /// shared input line into the accumulator MSB-first.
    fn sample_switches(&self) -> SwitchValue {
        let mut pins = self.pins.lock();
        let mut value: u8 = 0;
        for bit in (0..8u8).rev() {
            for (i, select) in pins.mux_select.iter_mut().enumerate() {
                let line_high = (bit >> i) & 1 == 1;
                select.write(if line_high { Level::High } else { Level::Low });
            }
            std::thread::sleep(Duration::from_micros(50));
            value <<= 1;
            if pins.mux_common.is_high() {
                value |= 1;
            }
        }
        value
    }

    fn sample_buttons(&self) -> [bool; 5] {
        let pins = self.pins.lock();
        [
            pins.button_red.is_low(),
            pins.button_yellow.is_low(),
            pins.button_green.is_low(),
            pins.button_blue.is_low(),
            pins.button_go.is_low(),
        ]
    }

    fn shift_out_display(pins: &mut Pins, value: Option<SwitchValue>) {
        let byte = value.unwrap_or(0);
        for bit in (0..8u8).rev() {
            pins.display_clock.set_low();
            pins.display_data.write(if (byte >> bit) & 1 == 1 { Level::High } else { Level::Low });
            pins.display_clock.set_high();
        }
    }
}

impl HardwareBackend for GpioBackend {
    fn kind(&self) -> HardwareBackendKind {
        HardwareBackendKind::Gpio
    }

    fn read_switches(&self) -> SwitchValue {
        self.sample_switches()
    }

    fn set_led(&self, led: LedId, state: LedState) {
        let idx = led as usize;
        let changed = {
            let mut leds = self.leds.lock();
            let prev = leds[idx];
            leds[idx] = state;
            prev.on != state.on || prev.brightness != state.brightness
        };
        let mut pins = self.pins.lock();
        let output = match led {
            LedId::Red => &mut pins.led_red,
            LedId::Yellow => &mut pins.led_yellow,
            LedId::Green => &mut pins.led_green,
            LedId::Blue => &mut pins.led_blue,
        };
        if state.on {
            output.set_high();
        } else {
            output.set_low();
        }
        drop(pins);
        if changed {
            self.sink.publish(
                "output.led.state_changed",
                serde_json::json!({
                    "color": led.as_str(),
                    "is_on": state.on,
                    "brightness": state.brightness,
                }),
                "hal:gpio",
            );
        }
    }

    fn led_state(&self, led: LedId) -> LedState {
        self.leds.lock()[led as usize]
    }

    fn set_display(&self, value: Option<SwitchValue>) {
        *self.display.lock() = value;
        Self::shift_out_display(&mut self.pins.lock(), value);
        self.sink.publish(
            "output.display.updated",
            serde_json::json!({ "value": value }),
            "hal:gpio",
        );
    }

    fn display_value(&self) -> Option<SwitchValue> {
        *self.display.lock()
    }

    fn draw_text(&self, text: ScreenText) {
        let content = ScreenContent::Text {
            content: text.content,
            options: ScreenTextOptions {
                font_size: text.font_size,
                fg: text.fg,
                bg: text.bg,
                align: text.align,
            },
        };
        *self.screen.lock() = content.clone();
        self.sink.publish(
            "output.screen.updated",
            serde_json::to_value(&content).unwrap_or_default(),
            "hal:gpio",
        );
    }

    fn clear_screen(&self, bg: Color) {
        let content = ScreenContent::Clear { content: (), options: ScreenClearOptions { bg } };
        *self.screen.lock() = content.clone();
        self.sink.publish(
            "output.screen.updated",
            serde_json::to_value(&content).unwrap_or_default(),
            "hal:gpio",
        );
    }

    fn screen_content(&self) -> ScreenContent {
        self.screen.lock().clone()
    }

    fn subscribe_buttons(&self) -> broadcast::Receiver<RawButtonEdge> {
        self.buttons_tx.subscribe()
    }

    fn subscribe_switch_edge(&self) -> broadcast::Receiver<SwitchValue> {
        self.switch_tx.subscribe()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
