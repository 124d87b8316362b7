// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::*;

fn sample() -> Config {
    serde_json::from_value(serde_json::json!({
        "hardware": {
            "button_red": 5, "button_yellow": 6, "button_green": 13, "button_blue": 19,
            "button_go": 26, "led_red": 12, "led_yellow": 16, "led_green": 20, "led_blue": 21,
            "mux_select": [2, 3, 4], "mux_common_input": 17,
            "display_data": 27, "display_clock": 22,
            "screen_width": 800, "screen_height": 480, "enable_audio": false
        },
        "system": {
            "apps_directory": "/opt/boss/apps",
            "log_level": "INFO",
            "log_file": null,
            "event_queue_size": 1000,
            "app_timeout_seconds": 900
        }
    }))
    .unwrap()
}

fn cli_with(args: &[&str]) -> Cli {
    let mut full = vec!["boss"];
    full.extend_from_slice(args);
    Cli::parse_from(full)
}

#[test]
fn valid_config_passes_validation() {
    assert!(sample().validate().is_ok());
}

#[test]
fn duplicate_pin_is_rejected() {
    let mut config = sample();
    config.hardware.button_yellow = config.hardware.button_red;
    assert!(matches!(config.validate(), Err(BossError::Config(_))));
}

#[test]
fn zero_screen_dimension_is_rejected() {
    let mut config = sample();
    config.hardware.screen_width = 0;
    assert!(config.validate().is_err());
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut config = sample();
    config.system.log_level = "VERBOSE".to_owned();
    assert!(config.validate().is_err());
}

#[test]
fn test_mode_forces_mock_backend_and_debug() {
    let config = sample();
    let cli = cli_with(&["--test-mode"]);
    assert_eq!(config.resolve_backend(&cli), HardwareBackendKind::Mock);
    assert_eq!(config.effective_log_level(&cli), "DEBUG");
}

#[test]
fn dev_mode_forces_emulator_backend_and_debug() {
    let config = sample();
    let cli = cli_with(&["--dev-mode"]);
    assert_eq!(config.resolve_backend(&cli), HardwareBackendKind::Emulator);
    assert_eq!(config.effective_log_level(&cli), "DEBUG");
}

#[test]
fn no_mode_flags_defaults_to_gpio() {
    let config = sample();
    let cli = cli_with(&[]);
    assert_eq!(config.resolve_backend(&cli), HardwareBackendKind::Gpio);
    assert_eq!(config.effective_log_level(&cli), "INFO");
}

#[test]
fn explicit_log_level_override_wins_over_config_file() {
    let config = sample();
    let cli = cli_with(&["--log-level", "ERROR"]);
    assert_eq!(config.effective_log_level(&cli), "ERROR");
}
