// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration (spec §6): a small `clap::Parser` for CLI flags and
//! environment overrides, plus the strict-JSON config file it points at.

use std::path::{Path, PathBuf};

use boss_hal::HardwareBackendKind;
use serde::Deserialize;

use crate::error::BossError;

const DEFAULT_CONFIG_PATH: &str = "/etc/boss/config.json";

/// Process-level CLI flags and their environment variable overrides.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "boss", version, about = "B.O.S.S. appliance runtime")]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, env = "BOSS_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: PathBuf,

    /// Override the configured log level.
    #[arg(long, env = "BOSS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Force the Mock HAL backend and DEBUG logging.
    #[arg(long, env = "BOSS_TEST_MODE")]
    pub test_mode: bool,

    /// Force the Emulator HAL backend and DEBUG logging.
    #[arg(long, env = "BOSS_DEV_MODE")]
    pub dev_mode: bool,
}

/// Pin assignments and screen geometry (spec §6 `hardware`).
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareConfig {
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
    pub screen_width: u32,
    pub screen_height: u32,
    pub enable_audio: bool,
}

/// System-level fields (spec §6 `system`).
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub apps_directory: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub event_queue_size: usize,
    pub app_timeout_seconds: u64,
}

/// The parsed, validated config file, paired with the `Cli` overrides that
/// apply on top of it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub hardware: HardwareConfig,
    pub system: SystemConfig,
}

impl Config {
    /// Reads and parses the config file named by `cli.config_path`, then
    /// runs `validate`. Does not apply CLI/env overrides — see
    /// `effective_log_level` and `resolve_backend` for those.
    pub fn load(cli: &Cli) -> Result<Config, BossError> {
        let config = Self::load_from(&cli.config_path)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Config, BossError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BossError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|err| BossError::Config(format!("invalid config at {}: {err}", path.display())))
    }

    /// Pin uniqueness, positive dimensions, valid log level (spec §4.8 step 1).
    pub fn validate(&self) -> Result<(), BossError> {
        let pins = [
            self.hardware.button_red,
            self.hardware.button_yellow,
            self.hardware.button_green,
            self.hardware.button_blue,
            self.hardware.button_go,
            self.hardware.led_red,
            self.hardware.led_yellow,
            self.hardware.led_green,
            self.hardware.led_blue,
            self.hardware.mux_select[0],
            self.hardware.mux_select[1],
            self.hardware.mux_select[2],
            self.hardware.mux_common_input,
            self.hardware.display_data,
            self.hardware.display_clock,
        ];
        let mut seen = std::collections::HashSet::new();
        for pin in pins {
            if !seen.insert(pin) {
                return Err(BossError::Config(format!("pin {pin} assigned more than once")));
            }
        }

        if self.hardware.screen_width == 0 || self.hardware.screen_height == 0 {
            return Err(BossError::Config("screen dimensions must be positive".into()));
        }

        valid_log_level(&self.system.log_level)?;

        if self.system.event_queue_size == 0 {
            return Err(BossError::Config("event_queue_size must be >= 1".into()));
        }
        if self.system.app_timeout_seconds == 0 {
            return Err(BossError::Config("app_timeout_seconds must be >= 1".into()));
        }

        Ok(())
    }

    /// The log level after CLI/env overrides, bumped to DEBUG by
    /// `--test-mode`/`--dev-mode` (spec §6 environment variable table).
    pub fn effective_log_level(&self, cli: &Cli) -> String {
        if cli.test_mode || cli.dev_mode {
            return "DEBUG".to_owned();
        }
        cli.log_level.clone().unwrap_or_else(|| self.system.log_level.clone())
    }

    /// Which HAL backend to construct. `--test-mode` and `--dev-mode` force
    /// Mock and Emulator respectively; otherwise this is a real deployment
    /// and the GPIO backend is used.
    pub fn resolve_backend(&self, cli: &Cli) -> HardwareBackendKind {
        if cli.test_mode {
            HardwareBackendKind::Mock
        } else if cli.dev_mode {
            HardwareBackendKind::Emulator
        } else {
            HardwareBackendKind::Gpio
        }
    }

    pub fn gpio_pins(&self) -> boss_hal::GpioPins {
        boss_hal::GpioPins {
            button_red: self.hardware.button_red,
            button_yellow: self.hardware.button_yellow,
            button_green: self.hardware.button_green,
            button_blue: self.hardware.button_blue,
            button_go: self.hardware.button_go,
            led_red: self.hardware.led_red,
            led_yellow: self.hardware.led_yellow,
            led_green: self.hardware.led_green,
            led_blue: self.hardware.led_blue,
            mux_select: self.hardware.mux_select,
            mux_common_input: self.hardware.mux_common_input,
            display_data: self.hardware.display_data,
            display_clock: self.hardware.display_clock,
        }
    }
}

fn valid_log_level(level: &str) -> Result<(), BossError> {
    match level.to_uppercase().as_str() {
        "DEBUG" | "INFO" | "WARNING" | "ERROR" | "CRITICAL" => Ok(()),
        other => Err(BossError::Config(format!("invalid log_level '{other}'"))),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
