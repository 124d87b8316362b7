// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// The error kinds named in spec §7. Only `Config` is fatal at startup;
/// everything else is converted into an event plus a log line by the
/// component that encounters it and never kills the Runner or the Bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BossError {
    /// Malformed or invalid configuration. Fatal at startup only.
    Config(String),
    /// Invalid or deprecated manifest. The app becomes unrunnable, never fatal.
    Manifest { app: String, reason: String },
    /// Backend-level I/O failure.
    Hardware(String),
    /// Uncaught exception from a mini-app.
    App { app: String, message: String },
    /// A mini-app exceeded its `timeout_seconds`.
    Timeout { app: String, seconds: u64 },
    /// The event bus queue was at capacity when a publish was attempted.
    BusOverflow { event_type: String },
}

impl fmt::Display for BossError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BossError::Config(msg) => write!(f, "configuration error: {msg}"),
            BossError::Manifest { app, reason } => {
                write!(f, "manifest error for '{app}': {reason}")
            }
            BossError::Hardware(msg) => write!(f, "hardware error: {msg}"),
            BossError::App { app, message } => write!(f, "app '{app}' error: {message}"),
            BossError::Timeout { app, seconds } => {
                write!(f, "app '{app}' exceeded its {seconds}s timeout")
            }
            BossError::BusOverflow { event_type } => {
                write!(f, "event bus overflow, dropped '{event_type}'")
            }
        }
    }
}

impl std::error::Error for BossError {}

/// Process exit codes (spec §6).
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const CONFIG_OR_STARTUP_FAILURE: i32 = 1;
    pub const UNRECOVERABLE_RUNTIME_ERROR: i32 = 2;
}
