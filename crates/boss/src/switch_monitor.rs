// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Switch Monitor (C3, spec §4.3): debounces the multiplexed 8-bit switch
//! input and publishes committed transitions.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boss_hal::HardwareBackend;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::EventBus;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Last committed switch value, shared with whoever needs a snapshot
/// without waiting on a bus round-trip (the Runner reads this on Go-press).
pub struct SwitchMonitor {
    committed: Arc<AtomicU8>,
}

impl SwitchMonitor {
    /// Spawns the polling task and returns a handle exposing the last
    /// committed value. `initial` seeds the committed value so the first
    /// stable sample equal to it does not spuriously publish a change.
    pub fn spawn(
        hal: Arc<dyn HardwareBackend>,
        bus: Arc<EventBus>,
        shutdown: CancellationToken,
        initial: u8,
    ) -> SwitchMonitor {
        let committed = Arc::new(AtomicU8::new(initial));
        let committed_task = Arc::clone(&committed);

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(POLL_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut candidate: Option<u8> = None;
            let mut stable_samples = 0u8;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {}
                }

                let sample = hal.read_switches();
                let last_committed = committed_task.load(Ordering::SeqCst);

                if sample == last_committed {
                    candidate = None;
                    stable_samples = 0;
                    continue;
                }

                if candidate == Some(sample) {
                    stable_samples += 1;
                } else {
                    candidate = Some(sample);
                    stable_samples = 1;
                }

                if stable_samples >= 2 {
                    debug!(old = last_committed, new = sample, "switch value committed");
                    // set_display before the event is delivered (spec §8 invariant 1).
                    hal.set_display(Some(sample));
                    bus.publish(
                        "input.switch.changed",
                        serde_json::json!({"old_value": last_committed, "new_value": sample}),
                        "switch_monitor",
                    );
                    committed_task.store(sample, Ordering::SeqCst);
                    candidate = None;
                    stable_samples = 0;
                }
            }
        });

        SwitchMonitor { committed }
    }

    pub fn current_value(&self) -> u8 {
        self.committed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "switch_monitor_tests.rs"]
mod tests;
