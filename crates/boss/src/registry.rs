// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App Registry (C5, spec §4.5): scans the apps directory, validates
//! manifests, and maps switch values to them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::manifest::Manifest;

/// On-disk shape of the app-mappings file (spec §6).
#[derive(Debug, Deserialize)]
struct RawAppMappings {
    app_mappings: BTreeMap<String, String>,
    #[serde(default)]
    #[allow(dead_code)]
    parameters: serde_json::Map<String, serde_json::Value>,
}

/// One entry in the registry: a validated manifest plus the directory it
/// came from (needed to resolve `asset_path` later).
#[derive(Debug, Clone)]
pub struct RegisteredApp {
    pub manifest: Manifest,
    pub directory: PathBuf,
}

/// Scans `apps_directory` for mini-app manifests and loads the switch→app
/// mapping. Invalid manifests are recorded as unavailable rather than
/// failing startup (spec §4.5).
pub struct AppRegistry {
    apps: BTreeMap<String, RegisteredApp>,
    mapping: BTreeMap<u8, String>,
}

impl AppRegistry {
    /// Scans `apps_directory` for `<name>/manifest.json` files and loads
    /// `app_mappings.json` from the same directory. `default_timeout_seconds`
    /// (spec §6 `system.app_timeout_seconds`) is used for any manifest that
    /// omits its own `timeout_seconds`.
    pub fn load(apps_directory: &Path, default_timeout_seconds: u64) -> anyhow::Result<AppRegistry> {
        let mut apps = BTreeMap::new();

        if apps_directory.is_dir() {
            for entry in std::fs::read_dir(apps_directory)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let directory = entry.path();
                let directory_name = entry.file_name().to_string_lossy().into_owned();
                let manifest_path = directory.join("manifest.json");
                if !manifest_path.is_file() {
                    continue;
                }

                match std::fs::read_to_string(&manifest_path) {
                    Ok(raw) => match Manifest::parse(&directory_name, &raw, default_timeout_seconds) {
                        Ok((manifest, warnings)) => {
                            for warning in warnings {
                                warn!(app = %directory_name, %warning, "manifest warning");
                            }
                            info!(app = %manifest.name, "registered mini-app");
                            apps.insert(
                                manifest.name.clone(),
                                RegisteredApp { manifest, directory },
                            );
                        }
                        Err(reason) => {
                            warn!(app = %directory_name, %reason, "manifest rejected");
                        }
                    },
                    Err(err) => warn!(app = %directory_name, error = %err, "cannot read manifest"),
                }
            }
        } else {
            warn!(path = %apps_directory.display(), "apps directory does not exist");
        }

        let mapping_path = apps_directory.join("app_mappings.json");
        let mapping = if mapping_path.is_file() {
            let raw = std::fs::read_to_string(&mapping_path)?;
            let parsed: RawAppMappings = serde_json::from_str(&raw)?;
            let mut mapping = BTreeMap::new();
            for (key, name) in parsed.app_mappings {
                match key.parse::<u8>() {
                    Ok(value) => {
                        mapping.insert(value, name);
                    }
                    Err(_) => warn!(%key, "ignoring non-numeric app mapping key"),
                }
            }
            mapping
        } else {
            warn!(path = %mapping_path.display(), "app mappings file does not exist");
            BTreeMap::new()
        };

        Ok(AppRegistry { apps, mapping })
    }

    /// Returns the manifest mapped to `switch_value`, if any, and if its
    /// manifest was validated successfully. Missing values are not an error
    /// (spec §3 AppMapping: "gaps are permitted").
    pub fn resolve(&self, switch_value: u8) -> Option<&RegisteredApp> {
        let name = self.mapping.get(&switch_value)?;
        self.apps.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredApp> {
        self.apps.get(name)
    }

    /// Environment variables named in `required_env` that are absent from
    /// the process environment (spec §4.5: checked at resolve time).
    pub fn missing_env(&self, app: &RegisteredApp) -> Vec<String> {
        app.manifest
            .required_env
            .iter()
            .filter(|var| std::env::var(var).is_err())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
