// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// An 8-bit value sampled from the switch multiplexer. Always in `[0, 255]`
/// by construction — it's a bare `u8`, not a newtype, because every value of
/// the underlying type is already valid.
pub type SwitchValue = u8;

/// Which of the five front-panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonId {
    Red,
    Yellow,
    Green,
    Blue,
    Go,
}

impl ButtonId {
    pub const ALL: [ButtonId; 5] =
        [ButtonId::Red, ButtonId::Yellow, ButtonId::Green, ButtonId::Blue, ButtonId::Go];

    /// The LED gating this button, or `None` for the ungated Go button.
    pub fn paired_led(self) -> Option<LedId> {
        match self {
            ButtonId::Red => Some(LedId::Red),
            ButtonId::Yellow => Some(LedId::Yellow),
            ButtonId::Green => Some(LedId::Green),
            ButtonId::Blue => Some(LedId::Blue),
            ButtonId::Go => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ButtonId::Red => "red",
            ButtonId::Yellow => "yellow",
            ButtonId::Green => "green",
            ButtonId::Blue => "blue",
            ButtonId::Go => "go",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "red" => Some(ButtonId::Red),
            "yellow" => Some(ButtonId::Yellow),
            "green" => Some(ButtonId::Green),
            "blue" => Some(ButtonId::Blue),
            "go" => Some(ButtonId::Go),
            _ => None,
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four color-coded LEDs, paired 1:1 with a same-color button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedId {
    Red,
    Yellow,
    Green,
    Blue,
}

impl LedId {
    pub const ALL: [LedId; 4] = [LedId::Red, LedId::Yellow, LedId::Green, LedId::Blue];

    pub fn as_str(self) -> &'static str {
        match self {
            LedId::Red => "red",
            LedId::Yellow => "yellow",
            LedId::Green => "green",
            LedId::Blue => "blue",
        }
    }

    pub fn button(self) -> ButtonId {
        match self {
            LedId::Red => ButtonId::Red,
            LedId::Yellow => ButtonId::Yellow,
            LedId::Green => ButtonId::Green,
            LedId::Blue => ButtonId::Blue,
        }
    }
}

impl fmt::Display for LedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commanded state of an LED. The HAL tracks the last-commanded `LedState`
/// for every LED and backends must reflect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedState {
    pub on: bool,
    /// `0.0..=1.0`. Backends that cannot dim treat any positive value as full on.
    pub brightness: f32,
}

impl LedState {
    pub const OFF: LedState = LedState { on: false, brightness: 0.0 };

    pub fn on(brightness: f32) -> Self {
        Self { on: true, brightness: brightness.clamp(0.0, 1.0) }
    }
}

impl Default for LedState {
    fn default() -> Self {
        Self::OFF
    }
}

/// A raw, undebounced button edge as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawButtonEdge {
    pub button: ButtonId,
    pub pressed: bool,
}

/// Which HAL backend is active for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareBackendKind {
    Gpio,
    Emulator,
    Mock,
}

impl HardwareBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HardwareBackendKind::Gpio => "gpio",
            HardwareBackendKind::Emulator => "emulator",
            HardwareBackendKind::Mock => "mock",
        }
    }
}

impl fmt::Display for HardwareBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RGB color used for screen foreground/background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const WHITE: Color = Color(255, 255, 255);

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Text alignment for `draw_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenAlign {
    Left,
    Center,
    Right,
}

impl Default for ScreenAlign {
    fn default() -> Self {
        ScreenAlign::Left
    }
}

/// Parameters for a `draw_text` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenText {
    pub content: String,
    pub font_size: u16,
    pub fg: Color,
    pub bg: Color,
    pub align: ScreenAlign,
}

impl ScreenText {
    pub fn simple(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font_size: 24,
            fg: Color::WHITE,
            bg: Color::BLACK,
            align: ScreenAlign::Center,
        }
    }
}

/// Descriptor of whatever is currently shown on the main screen, mirrored in
/// `output.screen.updated` events and the emulator's `initial_state` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "lowercase")]
pub enum ScreenContent {
    Text { content: String, options: ScreenTextOptions },
    Image { content: String, options: ScreenImageOptions },
    Clear { content: (), options: ScreenClearOptions },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenTextOptions {
    pub font_size: u16,
    pub fg: Color,
    pub bg: Color,
    pub align: ScreenAlign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenImageOptions {
    pub scale: f32,
    pub position: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenClearOptions {
    pub bg: Color,
}
