// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mini-app contract and the static registry that stands in for dynamic
//! plugin loading (spec §9 Design Notes: "a statically-registered map of
//! `name → entrypoint` is preferable where the language disallows dynamic
//! code loading").

pub mod startup;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::MiniAppApi;

/// A runnable mini-app. `run` is handed the cancellation token and API
/// facade and must return once `cancel` fires; the Runner enforces a grace
/// period and then a hard timeout on top of this cooperative contract.
pub trait MiniApp: Send + Sync {
    fn run(&self, cancel: CancellationToken, api: MiniAppApi) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

type Constructor = Arc<dyn Fn() -> Box<dyn MiniApp> + Send + Sync>;

/// Maps a manifest's `name` to the code that implements it. Deliberately
/// distinct from `AppRegistry`: the registry answers "what manifest is
/// mapped to this switch value", this answers "what code runs for this
/// manifest name".
pub struct StaticAppRegistry {
    constructors: HashMap<String, Constructor>,
}

impl StaticAppRegistry {
    pub fn new() -> Self {
        let mut constructors: HashMap<String, Constructor> = HashMap::new();
        constructors.insert(
            startup::STARTUP_APP_NAME.to_owned(),
            Arc::new(|| Box::new(startup::StartupApp) as Box<dyn MiniApp>),
        );
        Self { constructors }
    }

    /// Registers an additional mini-app implementation under `name`,
    /// overwriting any existing entry. Business-logic mini-apps
    /// (weather, jokes, etc.) are out of scope here; this exists so
    /// integration tests can register throwaway apps.
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn construct(&self, name: &str) -> Option<Box<dyn MiniApp>> {
        self.constructors.get(name).map(|ctor| ctor())
    }
}

impl Default for StaticAppRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
