// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App Runner (C6, spec §4.6): launches/stops a single mini-app at a time,
//! enforces the timeout/cooldown state machine, and treats a task that
//! outlives forced termination as a leaked resource (spec §9).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boss_hal::HardwareBackend;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::apps::StaticAppRegistry;
use crate::bus::EventBus;
use crate::manifest::TimeoutBehavior;
use crate::registry::RegisteredApp;

/// Grace period after cancellation before forced termination (spec §4.6, §5).
const GRACE_PERIOD: Duration = Duration::from_secs(2);
/// Extra wait after `abort()` to let the task actually unwind. `abort` is
/// cooperative at the next `.await` point; a task stuck in a tight
/// non-yielding loop never observes it (spec §9).
const ABORT_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Normal,
    Timeout,
    Error,
    UserStop,
    Shutdown,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Normal => "normal",
            StopReason::Timeout => "timeout",
            StopReason::Error => "error",
            StopReason::UserStop => "user_stop",
            StopReason::Shutdown => "shutdown",
        }
    }
}

/// Handle to the currently-active run, held by `Runner` and consulted by
/// `stop`/`launch` for preemption. The supervisor task (spawned by
/// `launch`) owns the actual `JoinHandle` and does the real waiting.
struct ActiveHandle {
    generation: u64,
    cancel: CancellationToken,
    reason: Arc<SyncMutex<Option<StopReason>>>,
    stopped_rx: AsyncMutex<Option<oneshot::Receiver<()>>>,
}

struct RunnerState {
    active: Option<Arc<ActiveHandle>>,
    leaked: bool,
}

/// Owns at most one `AppRun`. Constructed once by the orchestrator and
/// shared behind an `Arc` with every task that needs to launch or stop apps
/// (the go-button handler, shutdown handler, and the timeout supervisors
/// this module spawns for itself).
pub struct Runner {
    hal: Arc<dyn HardwareBackend>,
    bus: Arc<EventBus>,
    apps: Arc<StaticAppRegistry>,
    screen_width: u32,
    screen_height: u32,
    startup: RegisteredApp,
    next_generation: AtomicU64,
    state: AsyncMutex<RunnerState>,
}

impl Runner {
    pub fn new(
        hal: Arc<dyn HardwareBackend>,
        bus: Arc<EventBus>,
        apps: Arc<StaticAppRegistry>,
        screen_width: u32,
        screen_height: u32,
        startup: RegisteredApp,
    ) -> Arc<Runner> {
        Arc::new(Runner {
            hal,
            bus,
            apps,
            screen_width,
            screen_height,
            startup,
            next_generation: AtomicU64::new(0),
            state: AsyncMutex::new(RunnerState { active: None, leaked: false }),
        })
    }

    /// Whether a previously leaked task has permanently disabled launches
    /// (spec §9: "refuse further launches until a restart").
    pub async fn is_leaked(&self) -> bool {
        self.state.lock().await.leaked
    }

    /// If another app is running, stops it (`reason=user_stop`) and waits for
    /// it to terminate before starting `registered` (spec §4.6).
    pub async fn launch(runner: &Arc<Runner>, registered: &RegisteredApp, switch_value: u8) -> Result<(), crate::error::BossError> {
        if runner.state.lock().await.leaked {
            runner.bus.publish(
                "system.error",
                serde_json::json!({
                    "code": "runner_leaked",
                    "message": "a previous app could not be terminated; the runner refuses further launches until restart",
                }),
                "runner",
            );
            return Err(crate::error::BossError::App {
                app: registered.manifest.name.clone(),
                message: "runner has a leaked task and refuses further launches".into(),
            });
        }

        let existing = runner.state.lock().await.active.take();
        if let Some(existing) = existing {
            Runner::request_stop(existing, StopReason::UserStop).await;
        }

        let mini_app = match runner.apps.construct(&registered.manifest.name) {
            Some(app) => app,
            None => {
                runner.bus.publish(
                    "system.error",
                    serde_json::json!({
                        "code": "no_implementation",
                        "message": format!("no mini-app implementation registered for '{}'", registered.manifest.name),
                    }),
                    "runner",
                );
                return Err(crate::error::BossError::App {
                    app: registered.manifest.name.clone(),
                    message: "no mini-app implementation registered".into(),
                });
            }
        };

        let generation = runner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let reason = Arc::new(SyncMutex::new(None));
        let (stopped_tx, stopped_rx) = oneshot::channel();

        let api = crate::api::MiniAppApi::new(
            registered.manifest.name.clone(),
            registered.directory.clone(),
            Arc::clone(&runner.hal),
            Arc::clone(&runner.bus),
            runner.screen_width,
            runner.screen_height,
        );

        let task_cancel = cancel.clone();
        let app_handle: JoinHandle<()> = tokio::spawn(async move { mini_app.run(task_cancel, api).await });

        info!(app = %registered.manifest.name, switch_value, generation, "launching mini-app");
        runner.bus.publish(
            "system.app.started",
            serde_json::json!({"app_name": registered.manifest.name, "switch_value": switch_value}),
            "runner",
        );

        let active = Arc::new(ActiveHandle {
            generation,
            cancel: cancel.clone(),
            reason: Arc::clone(&reason),
            stopped_rx: AsyncMutex::new(Some(stopped_rx)),
        });
        runner.state.lock().await.active = Some(Arc::clone(&active));

        tokio::spawn(Runner::supervise(
            Arc::clone(runner),
            generation,
            registered.clone(),
            switch_value,
            app_handle,
            cancel,
            reason,
            stopped_tx,
        ));

        Ok(())
    }

    /// Stops the currently active app, if any, with `reason` and waits for
    /// it to finish terminating (spec §4.6: `stop(reason)`).
    pub async fn stop(runner: &Arc<Runner>, reason: StopReason) {
        let existing = runner.state.lock().await.active.take();
        if let Some(existing) = existing {
            Runner::request_stop(existing, reason).await;
        }
    }

    async fn request_stop(active: Arc<ActiveHandle>, reason: StopReason) {
        {
            let mut guard = active.reason.lock();
            if guard.is_none() {
                *guard = Some(reason);
            }
        }
        active.cancel.cancel();

        let receiver = active.stopped_rx.lock().await.take();
        if let Some(receiver) = receiver {
            // The supervisor races this cancellation against the task and
            // enforces the grace period and force-termination itself; this
            // is just a generous upper bound in case it never signals.
            let _ = tokio::time::timeout(GRACE_PERIOD + ABORT_SETTLE + Duration::from_secs(1), receiver).await;
        }
    }

    async fn clear_if_current(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if matches!(&state.active, Some(active) if active.generation == generation) {
            state.active = None;
        }
    }

    async fn mark_leaked(&self) {
        self.state.lock().await.leaked = true;
    }

    /// Owns the mini-app task end to end: races its natural completion
    /// against the manifest's timeout deadline and against an external stop
    /// request (user preemption, shutdown), then applies `timeout_behavior`
    /// or, for an external stop, just tears down.
    async fn supervise(
        runner: Arc<Runner>,
        generation: u64,
        registered: RegisteredApp,
        switch_value: u8,
        mut handle: JoinHandle<()>,
        cancel: CancellationToken,
        reason: Arc<SyncMutex<Option<StopReason>>>,
        stopped_tx: oneshot::Sender<()>,
    ) {
        let timeout_duration = Duration::from_secs(registered.manifest.timeout_seconds);

        tokio::select! {
            result = &mut handle => {
                Runner::finish(&runner, generation, &registered, switch_value, &reason, result).await;
                let _ = stopped_tx.send(());
            }
            _ = tokio::time::sleep(timeout_duration) => {
                Runner::on_timeout(runner, generation, registered, switch_value, handle, cancel, reason, stopped_tx).await;
            }
            _ = cancel.cancelled() => {
                Runner::on_cancelled(runner, generation, registered, switch_value, handle, reason, stopped_tx).await;
            }
        }
    }

    /// Waits up to `GRACE_PERIOD` for `handle` to exit after cancellation has
    /// already been requested; force-aborts and waits `ABORT_SETTLE` if it
    /// hasn't. Returns the join result if the task exited in either window,
    /// or `None` if it outlived forced termination (leaked).
    async fn terminate_after_grace(handle: &mut JoinHandle<()>) -> Option<Result<(), tokio::task::JoinError>> {
        match tokio::time::timeout(GRACE_PERIOD, &mut *handle).await {
            Ok(result) => Some(result),
            Err(_) => {
                handle.abort();
                tokio::time::timeout(ABORT_SETTLE, &mut *handle).await.ok()
            }
        }
    }

    /// The mini-app task ended (on its own, via cancellation, or by panicking).
    async fn finish(
        runner: &Arc<Runner>,
        generation: u64,
        registered: &RegisteredApp,
        switch_value: u8,
        reason: &Arc<SyncMutex<Option<StopReason>>>,
        result: Result<(), tokio::task::JoinError>,
    ) {
        let resolved = reason.lock().take().unwrap_or(if result.is_err() { StopReason::Error } else { StopReason::Normal });

        if let Err(join_err) = &result {
            if !join_err.is_cancelled() {
                let message = join_err.to_string();
                warn!(app = %registered.manifest.name, %message, "mini-app task panicked");
                runner.bus.publish(
                    "system.app.error",
                    serde_json::json!({"app_name": registered.manifest.name, "error": message}),
                    "runner",
                );
            }
        }

        runner.bus.publish(
            "system.app.stopped",
            serde_json::json!({
                "app_name": registered.manifest.name,
                "switch_value": switch_value,
                "reason": resolved.as_str(),
            }),
            "runner",
        );
        runner.clear_if_current(generation).await;
    }

    /// The timeout deadline elapsed first; apply `timeout_behavior`.
    async fn on_timeout(
        runner: Arc<Runner>,
        generation: u64,
        registered: RegisteredApp,
        switch_value: u8,
        mut handle: JoinHandle<()>,
        cancel: CancellationToken,
        reason: Arc<SyncMutex<Option<StopReason>>>,
        stopped_tx: oneshot::Sender<()>,
    ) {
        if registered.manifest.timeout_behavior == TimeoutBehavior::None {
            // No-op at this deadline: the app keeps running. Still honor a
            // later cancellation (e.g. user preemption) by continuing to
            // race the handle against it, same as the main supervise loop.
            tokio::select! {
                result = &mut handle => {
                    Runner::finish(&runner, generation, &registered, switch_value, &reason, result).await;
                    let _ = stopped_tx.send(());
                }
                _ = cancel.cancelled() => {
                    Runner::on_cancelled(runner, generation, registered, switch_value, handle, reason, stopped_tx).await;
                }
            }
            return;
        }

        *reason.lock() = Some(StopReason::Timeout);
        cancel.cancel();

        let mut leaked = false;
        match Runner::terminate_after_grace(&mut handle).await {
            Some(Ok(())) => {}
            Some(Err(join_err)) => {
                if !join_err.is_cancelled() {
                    runner.bus.publish(
                        "system.app.error",
                        serde_json::json!({"app_name": registered.manifest.name, "error": join_err.to_string()}),
                        "runner",
                    );
                }
            }
            None => {
                leaked = true;
            }
        }

        runner.bus.publish(
            "system.app.stopped",
            serde_json::json!({"app_name": registered.manifest.name, "switch_value": switch_value, "reason": "timeout"}),
            "runner",
        );
        runner.clear_if_current(generation).await;
        let _ = stopped_tx.send(());

        if leaked {
            warn!(app = %registered.manifest.name, "mini-app task outlived forced termination; refusing further launches");
            runner.mark_leaked().await;
            runner.bus.publish(
                "system.error",
                serde_json::json!({
                    "code": "leaked_app_task",
                    "message": format!("'{}' did not terminate and was abandoned", registered.manifest.name),
                }),
                "runner",
            );
            return;
        }

        match registered.manifest.timeout_behavior {
            TimeoutBehavior::Return => {
                let startup = runner.startup.clone();
                let _ = Runner::launch(&runner, &startup, switch_value).await;
            }
            TimeoutBehavior::Rerun => {
                tokio::time::sleep(Duration::from_secs(registered.manifest.timeout_cooldown_seconds)).await;
                let _ = Runner::launch(&runner, &registered, switch_value).await;
            }
            TimeoutBehavior::None => unreachable!("handled above"),
        }
    }

    /// An external stop was requested (user preemption or shutdown) before
    /// the timeout deadline. Enforces the same grace-period-then-abort as a
    /// timeout, but never applies `timeout_behavior` afterward — the caller
    /// decides what, if anything, runs next.
    async fn on_cancelled(
        runner: Arc<Runner>,
        generation: u64,
        registered: RegisteredApp,
        switch_value: u8,
        mut handle: JoinHandle<()>,
        reason: Arc<SyncMutex<Option<StopReason>>>,
        stopped_tx: oneshot::Sender<()>,
    ) {
        let mut leaked = false;
        match Runner::terminate_after_grace(&mut handle).await {
            Some(Ok(())) => {}
            Some(Err(join_err)) => {
                if !join_err.is_cancelled() {
                    runner.bus.publish(
                        "system.app.error",
                        serde_json::json!({"app_name": registered.manifest.name, "error": join_err.to_string()}),
                        "runner",
                    );
                }
            }
            None => {
                leaked = true;
            }
        }

        let resolved = reason.lock().take().unwrap_or(StopReason::UserStop);
        runner.bus.publish(
            "system.app.stopped",
            serde_json::json!({
                "app_name": registered.manifest.name,
                "switch_value": switch_value,
                "reason": resolved.as_str(),
            }),
            "runner",
        );
        runner.clear_if_current(generation).await;
        let _ = stopped_tx.send(());

        if leaked {
            warn!(app = %registered.manifest.name, "mini-app task outlived forced termination; refusing further launches");
            runner.mark_leaked().await;
            runner.bus.publish(
                "system.error",
                serde_json::json!({
                    "code": "leaked_app_task",
                    "message": format!("'{}' did not terminate and was abandoned", registered.manifest.name),
                }),
                "runner",
            );
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
