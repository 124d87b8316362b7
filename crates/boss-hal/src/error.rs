// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Backend-level I/O failure (spec §7 `HardwareError`). Surfaced as
/// `system.error`; the HAL may refuse further writes to the affected device
/// but the rest of the system stays up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareError {
    pub device: &'static str,
    pub message: String,
}

impl HardwareError {
    pub fn new(device: &'static str, message: impl Into<String>) -> Self {
        Self { device, message: message.into() }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hardware error ({}): {}", self.device, self.message)
    }
}

impl std::error::Error for HardwareError {}
