// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in idle/ready admin app (spec §4.8 step 7: "launch the designated
//! startup app"). Draws a static ready screen and exits as soon as it is
//! cancelled; it exists so the Runner always has a real app to fall back to
//! and to exercise on every state transition.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::MiniApp;
use crate::api::MiniAppApi;

pub const STARTUP_APP_NAME: &str = "startup";

/// Cooperative poll cadence while idling (spec §5: "≤0.5 s; recommended ≤0.2 s").
const IDLE_POLL: Duration = Duration::from_millis(200);

pub struct StartupApp;

impl MiniApp for StartupApp {
    fn run(&self, cancel: CancellationToken, api: MiniAppApi) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            api.screen().display_text("dial a value and press Go", None, None, None, None);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
