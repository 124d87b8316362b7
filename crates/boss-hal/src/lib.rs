// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware abstraction layer for B.O.S.S. — one contract, three backends.
//!
//! [`HardwareBackend`] is the single trait the rest of the system programs
//! against. [`backend::mock::MockBackend`], [`backend::emulator::EmulatorBackend`],
//! and (behind the `gpio` feature) [`backend::gpio::GpioBackend`] all implement
//! it and must be observationally identical per the parity rule in `spec.md` §4.1.

pub mod backend;
pub mod emulator_surface;
pub mod error;
pub mod event_sink;
pub mod types;

pub use backend::emulator::EmulatorBackend;
pub use backend::mock::MockBackend;
#[cfg(feature = "gpio")]
pub use backend::gpio::GpioBackend;
pub use backend::{GpioPins, HardwareBackend};
pub use error::HardwareError;
pub use event_sink::EventSink;
pub use types::{
    ButtonId, Color, HardwareBackendKind, LedId, LedState, RawButtonEdge, ScreenAlign,
    ScreenContent, ScreenText, SwitchValue,
};
