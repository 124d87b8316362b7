// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System Orchestrator (C8, spec §4.8): the composition root. Builds every
//! component named in §2 and wires them together; holds no business logic of
//! its own beyond the startup sequence and the two system-level handlers
//! named in step 6.

use std::sync::Arc;

use boss_hal::{EmulatorBackend, HardwareBackend, HardwareBackendKind, MockBackend};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::apps::StaticAppRegistry;
use crate::bus::{BusEventSink, EventBus};
use crate::button_gate;
use crate::config::{Cli, Config};
use crate::error::BossError;
use crate::manifest::{Manifest, TimeoutBehavior};
use crate::registry::{AppRegistry, RegisteredApp};
use crate::runner::{Runner, StopReason};
use crate::switch_monitor::SwitchMonitor;

/// Fallback manifest for the built-in startup app (spec §4.8 step 7). It has
/// no on-disk manifest file — the "directory" it lives in is the apps
/// directory itself, which only matters for `asset_path` resolution, and the
/// startup app uses no assets.
fn startup_registered_app(apps_directory: &std::path::Path) -> RegisteredApp {
    let manifest = Manifest {
        name: crate::apps::startup::STARTUP_APP_NAME.to_owned(),
        description: "idle/ready screen".to_owned(),
        version: "0".to_owned(),
        author: "boss".to_owned(),
        tags: vec!["admin".to_owned()],
        entry_point: "main".to_owned(),
        timeout_seconds: crate::manifest::DEFAULT_TIMEOUT_SECONDS,
        timeout_behavior: TimeoutBehavior::None,
        timeout_cooldown_seconds: crate::manifest::DEFAULT_TIMEOUT_COOLDOWN_SECONDS,
        requires_network: false,
        requires_audio: false,
        external_apis: Vec::new(),
        required_env: Vec::new(),
        config: std::collections::HashMap::new(),
    };
    RegisteredApp { manifest, directory: apps_directory.to_path_buf() }
}

/// Everything the orchestrator built during `bootstrap`, held until `run`
/// tears it down. No field is a process-wide singleton — this struct is the
/// only place any of them lives (spec §9: "Global mutable state: none").
pub struct Orchestrator {
    hal: Arc<dyn HardwareBackend>,
    bus: Arc<EventBus>,
    registry: Arc<AppRegistry>,
    runner: Arc<Runner>,
    shutdown: CancellationToken,
    emulator_surface: Option<EmulatorSurfaceHandle>,
    queue_drain_deadline: std::time::Duration,
}

struct EmulatorSurfaceHandle {
    join: tokio::task::JoinHandle<()>,
}

impl Orchestrator {
    /// Steps 1-7 of spec §4.8, registering only the built-in startup app
    /// (spec §9: mini-app business logic is out of scope for the core).
    /// Real deployments that embed compiled-in mini-apps should use
    /// [`Orchestrator::bootstrap_with_apps`] instead, registering each
    /// business mini-app's `MiniApp` implementation before bootstrapping.
    pub async fn bootstrap(cli: Cli) -> Result<Orchestrator, BossError> {
        Self::bootstrap_with_apps(cli, StaticAppRegistry::new()).await
    }

    /// Like [`Orchestrator::bootstrap`], but takes a caller-supplied
    /// [`StaticAppRegistry`] of additional entry points — the static
    /// stand-in for dynamic plugin loading described in spec §9. The
    /// built-in startup app is always present regardless of what's passed.
    pub async fn bootstrap_with_apps(
        cli: Cli,
        mini_apps: StaticAppRegistry,
    ) -> Result<Orchestrator, BossError> {
        // 1. Load + validate configuration.
        let config = Config::load(&cli)?;

        // 2. Initialize logging.
        let log_level = config.effective_log_level(&cli);
        init_logging(&log_level);

        // 3. Construct the chosen HAL backend.
        let backend_kind = config.resolve_backend(&cli);
        let bus = EventBus::start(config.system.event_queue_size);
        let sink: Arc<dyn boss_hal::EventSink> = Arc::new(BusEventSink(Arc::clone(&bus)));

        let (hal, emulator_backend): (Arc<dyn HardwareBackend>, Option<Arc<EmulatorBackend>>) =
            match backend_kind {
                HardwareBackendKind::Mock => (MockBackend::new(Arc::clone(&sink)), None),
                HardwareBackendKind::Emulator => {
                    let backend = EmulatorBackend::new(Arc::clone(&sink));
                    (Arc::clone(&backend) as Arc<dyn HardwareBackend>, Some(backend))
                }
                #[cfg(feature = "gpio")]
                HardwareBackendKind::Gpio => {
                    let backend = boss_hal::GpioBackend::new(config.gpio_pins(), Arc::clone(&sink))
                        .map_err(|e| BossError::Hardware(e.to_string()))?;
                    (backend as Arc<dyn HardwareBackend>, None)
                }
                #[cfg(not(feature = "gpio"))]
                HardwareBackendKind::Gpio => {
                    return Err(BossError::Config(
                        "gpio backend selected but this build was compiled without the 'gpio' feature"
                            .into(),
                    ));
                }
            };
        info!(backend = %backend_kind, "hardware backend ready");

        // 5. Construct Switch Monitor, Button/LED Gate, App Registry, App Runner.
        let shutdown = CancellationToken::new();
        let initial_switches = hal.read_switches();
        let _switch_monitor =
            SwitchMonitor::spawn(Arc::clone(&hal), Arc::clone(&bus), shutdown.clone(), initial_switches);
        button_gate::spawn(Arc::clone(&hal), Arc::clone(&bus), shutdown.clone());

        let registry = Arc::new(
            AppRegistry::load(&config.system.apps_directory, config.system.app_timeout_seconds)
                .map_err(|e| BossError::Config(format!("loading app registry: {e:#}")))?,
        );

        let apps = Arc::new(mini_apps);
        let startup_app = startup_registered_app(&config.system.apps_directory);
        let runner = Runner::new(
            Arc::clone(&hal),
            Arc::clone(&bus),
            apps,
            config.hardware.screen_width,
            config.hardware.screen_height,
            startup_app,
        );

        // 6. Register system handlers.
        {
            let runner = Arc::clone(&runner);
            let registry = Arc::clone(&registry);
            let hal = Arc::clone(&hal);
            let bus_handle = Arc::clone(&bus);
            bus.subscribe("input.button.pressed", Some(filter_button("go")), move |_event| {
                let switch_value = hal.read_switches();
                match registry.resolve(switch_value) {
                    Some(app) => {
                        let missing = registry.missing_env(app);
                        if !missing.is_empty() {
                            bus_handle.publish(
                                "system.error",
                                serde_json::json!({
                                    "code": "missing_env",
                                    "message": format!(
                                        "app '{}' is missing required env vars: {:?}",
                                        app.manifest.name, missing
                                    ),
                                }),
                                "orchestrator",
                            );
                            return;
                        }
                        let runner = Arc::clone(&runner);
                        let app = app.clone();
                        tokio::spawn(async move {
                            if let Err(err) = Runner::launch(&runner, &app, switch_value).await {
                                error!(%err, "failed to launch app on go press");
                            }
                        });
                    }
                    None => {
                        bus_handle.publish(
                            "system.error",
                            serde_json::json!({
                                "code": "no_app_mapped",
                                "message": format!("no app mapped to switch value {switch_value}"),
                            }),
                            "orchestrator",
                        );
                    }
                }
            });
        }
        {
            let runner = Arc::clone(&runner);
            let shutdown = shutdown.clone();
            bus.subscribe("system.shutdown.initiated", None, move |_event| {
                let runner = Arc::clone(&runner);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    Runner::stop(&runner, StopReason::Shutdown).await;
                    shutdown.cancel();
                });
            });
        }

        // Spin up the Emulator debug surface (C9) if that's the active backend.
        let emulator_surface = if let Some(backend) = emulator_backend {
            Some(spawn_emulator_surface(backend, Arc::clone(&bus), shutdown.clone()).await?)
        } else {
            None
        };

        // 7. Launch the designated startup app.
        let startup = startup_registered_app(&config.system.apps_directory);
        Runner::launch(&runner, &startup, initial_switches)
            .await
            .map_err(|e| BossError::Config(format!("launching startup app: {e}")))?;

        Ok(Orchestrator {
            hal,
            bus,
            registry,
            runner,
            shutdown,
            emulator_surface,
            queue_drain_deadline: std::time::Duration::from_secs(2),
        })
    }

    /// Step 8 of §4.8: block until a shutdown signal arrives, then tear
    /// down in reverse construction order.
    pub async fn run(self) -> Result<(), BossError> {
        self.wait_for_signal().await;
        self.bus.publish(
            "system.shutdown.initiated",
            serde_json::json!({"reason": "signal"}),
            "orchestrator",
        );
        // Give the `system.shutdown.initiated` handler a moment to run and
        // cancel `self.shutdown` before we drain/stop everything below.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        Runner::stop(&self.runner, StopReason::Shutdown).await;
        self.shutdown.cancel();
        if let Some(surface) = self.emulator_surface {
            surface.join.abort();
        }
        self.bus.stop(self.queue_drain_deadline).await;
        info!("shutdown complete");
        Ok(())
    }

    #[cfg(unix)]
    async fn wait_for_signal(&self) {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = async {
                match sigterm.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending().await,
                }
            } => { info!("received SIGTERM"); }
            _ = async {
                match sigint.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending().await,
                }
            } => { info!("received SIGINT"); }
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_signal(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => { info!("received ctrl-c"); }
        }
    }

    pub fn hal(&self) -> &Arc<dyn HardwareBackend> {
        &self.hal
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }
}

fn filter_button(value: &str) -> std::collections::HashMap<String, serde_json::Value> {
    let mut filter = std::collections::HashMap::new();
    filter.insert("button".to_owned(), serde_json::json!(value));
    filter
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_lowercase()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn spawn_emulator_surface(
    backend: Arc<EmulatorBackend>,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
) -> Result<EmulatorSurfaceHandle, BossError> {
    let (router, state) = boss_hal::emulator_surface::build_router(backend);
    let addr = boss_hal::emulator_surface::default_bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BossError::Config(format!("binding emulator surface to {addr}: {e}")))?;

    let mut relay_rx = bus.relay_subscribe();
    let relay_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = relay_shutdown.cancelled() => break,
                event = relay_rx.recv() => match event {
                    Ok(event) => {
                        state.relay_event(&event.event_type, event.payload, event.epoch_ms);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
    });

    info!(%addr, "emulator surface listening");
    Ok(EmulatorSurfaceHandle { join })
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
