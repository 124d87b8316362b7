// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mini-app manifest parsing and validation (spec §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Non-exhaustive but fixed tag vocabulary (spec §3).
pub const VALID_TAGS: &[&str] =
    &["admin", "content", "network", "sensor", "novelty", "system", "utility"];

/// Keys that were valid in an earlier manifest era and are rejected outright
/// in new manifests (spec §3).
pub const DEPRECATED_KEYS: &[&str] =
    &["id", "title", "assets_required", "api_keys", "instructions"];

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 900;
pub const DEFAULT_TIMEOUT_COOLDOWN_SECONDS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutBehavior {
    Return,
    Rerun,
    None,
}

/// Raw, on-disk shape of `manifest.json`, before defaulting/validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub entry_point: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub timeout_behavior: Option<TimeoutBehavior>,
    #[serde(default)]
    pub timeout_cooldown_seconds: Option<u64>,
    #[serde(default)]
    pub requires_network: bool,
    #[serde(default)]
    pub requires_audio: bool,
    #[serde(default)]
    pub external_apis: Vec<String>,
    #[serde(default)]
    pub required_env: Vec<String>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

/// Validated, defaulted manifest record (spec §3).
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub tags: Vec<String>,
    pub entry_point: String,
    pub timeout_seconds: u64,
    pub timeout_behavior: TimeoutBehavior,
    pub timeout_cooldown_seconds: u64,
    pub requires_network: bool,
    pub requires_audio: bool,
    pub external_apis: Vec<String>,
    pub required_env: Vec<String>,
    pub config: HashMap<String, serde_json::Value>,
}

impl Manifest {
    /// Parses and validates a manifest read from `apps/<directory_name>/manifest.json`.
    /// Fixed, well-known keys from an earlier manifest era (spec §3) are
    /// always rejected; any other unrecognized key only produces a warning,
    /// returned alongside the manifest on success. `default_timeout_seconds`
    /// is the system-level default (spec §6 `system.app_timeout_seconds`)
    /// used when the manifest itself omits `timeout_seconds`.
    pub fn parse(
        directory_name: &str,
        raw_json: &str,
        default_timeout_seconds: u64,
    ) -> Result<(Manifest, Vec<String>), String> {
        let raw: RawManifest =
            serde_json::from_str(raw_json).map_err(|err| format!("invalid JSON: {err}"))?;

        if raw.name != directory_name {
            return Err(format!(
                "manifest name '{}' does not match directory name '{directory_name}'",
                raw.name
            ));
        }

        if raw.tags.is_empty() {
            return Err("tags must be a non-empty subset of the known tag set".to_owned());
        }
        for tag in &raw.tags {
            if !VALID_TAGS.contains(&tag.as_str()) {
                return Err(format!("unknown tag '{tag}'"));
            }
        }

        let mut warnings = Vec::new();
        for key in raw.unknown.keys() {
            if DEPRECATED_KEYS.contains(&key.as_str()) {
                return Err(format!("deprecated manifest key '{key}' is not permitted"));
            }
            warnings.push(format!("unrecognized manifest key '{key}'"));
        }

        let timeout_seconds = raw.timeout_seconds.unwrap_or(default_timeout_seconds);
        if timeout_seconds == 0 {
            return Err("timeout_seconds must be a positive integer".to_owned());
        }

        let timeout_behavior = raw.timeout_behavior.unwrap_or_else(|| {
            if raw.tags.iter().any(|t| t == "network") {
                TimeoutBehavior::Rerun
            } else {
                TimeoutBehavior::Return
            }
        });

        Ok((
            Manifest {
                name: raw.name,
                description: raw.description.unwrap_or_default(),
                version: raw.version.unwrap_or_default(),
                author: raw.author.unwrap_or_default(),
                tags: raw.tags,
                entry_point: raw.entry_point.unwrap_or_else(|| "main".to_owned()),
                timeout_seconds,
                timeout_behavior,
                timeout_cooldown_seconds: raw
                    .timeout_cooldown_seconds
                    .unwrap_or(DEFAULT_TIMEOUT_COOLDOWN_SECONDS),
                requires_network: raw.requires_network,
                requires_audio: raw.requires_audio,
                external_apis: raw.external_apis,
                required_env: raw.required_env,
                config: raw.config,
            },
            warnings,
        ))
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
