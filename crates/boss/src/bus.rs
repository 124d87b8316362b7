// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus (spec §4.2) — the sole nervous system between hardware,
//! orchestrator, and mini-apps. Typed publish/subscribe with async fan-out,
//! a bounded queue, per-subscription payload filters, and fault isolation: a
//! handler that panics never blocks delivery to other handlers or to later
//! events.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Identifies one `subscribe` registration. Returned by `subscribe`, passed
/// back to `unsubscribe`.
pub type SubscriptionId = Uuid;

/// One published event. `monotonic` backs ordering/timeout logic;
/// `epoch_ms` is only there so the event can be serialized for the emulator
/// relay and logs.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub payload: Value,
    pub monotonic: Instant,
    pub epoch_ms: u64,
    pub source: String,
}

impl Event {
    fn new(event_type: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            monotonic: Instant::now(),
            epoch_ms: epoch_ms(),
            source: source.into(),
        }
    }
}

pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    event_type: String,
    handler: Handler,
    filter: Option<HashMap<String, Value>>,
    fault_count: AtomicU32,
}

impl Subscription {
    fn matches(&self, event: &Event) -> bool {
        if self.event_type != event.event_type {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => filter.iter().all(|(k, v)| event.payload.get(k) == Some(v)),
        }
    }
}

/// Default bounded queue size (spec §4.2: "bounded (default ≈1000)").
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Typed publish/subscribe bus. One worker task drains the queue and
/// dispatches to matching subscriptions; publishers never block on it.
pub struct EventBus {
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    diag_tx: mpsc::UnboundedSender<Event>,
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    relay_tx: broadcast::Sender<Event>,
    shutdown: CancellationToken,
    stopped: AtomicBool,
    capacity: usize,
}

impl EventBus {
    /// Construct the bus and spawn its worker task.
    pub fn start(capacity: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (diag_tx, diag_rx) = mpsc::unbounded_channel();
        let (relay_tx, _) = broadcast::channel(capacity.max(1));
        let subscriptions = Arc::new(RwLock::new(Vec::new()));
        let shutdown = CancellationToken::new();

        let bus = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            diag_tx,
            subscriptions: Arc::clone(&subscriptions),
            worker: Mutex::new(None),
            relay_tx: relay_tx.clone(),
            shutdown: shutdown.clone(),
            stopped: AtomicBool::new(false),
            capacity,
        });

        let handle = tokio::spawn(Self::run_worker(rx, diag_rx, subscriptions, relay_tx, shutdown));
        *bus.worker.lock() = Some(handle);
        bus
    }

    async fn run_worker(
        mut rx: mpsc::Receiver<Event>,
        mut diag_rx: mpsc::UnboundedReceiver<Event>,
        subscriptions: Arc<RwLock<Vec<Subscription>>>,
        relay_tx: broadcast::Sender<Event>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    // Drain whatever is already queued before exiting.
                    match rx.try_recv() {
                        Ok(event) => event,
                        Err(_) => break,
                    }
                }
                Some(event) = diag_rx.recv() => event,
                Some(event) = rx.recv() => event,
                else => break,
            };

            let _ = relay_tx.send(event.clone());

            let subs = subscriptions.read();
            for sub in subs.iter().filter(|s| s.matches(&event)) {
                let handler = Arc::clone(&sub.handler);
                let event_ref = &event;
                let result =
                    std::panic::catch_unwind(AssertUnwindSafe(|| (handler)(event_ref)));
                if let Err(panic) = result {
                    let count = sub.fault_count.fetch_add(1, Ordering::SeqCst) + 1;
                    let message = panic_message(&panic);
                    error!(
                        subscription_id = %sub.id,
                        event_type = %event.event_type,
                        count,
                        %message,
                        "event handler panicked"
                    );
                    let error_event = Event::new(
                        "system.error",
                        serde_json::json!({
                            "code": "handler_panic",
                            "message": message,
                            "subscription_id": sub.id.to_string(),
                            "count": count,
                        }),
                        "bus",
                    );
                    let _ = relay_tx.send(error_event);
                }
            }
        }
        info!("event bus worker stopped");
    }

    /// Non-blocking publish. On overflow the event is dropped and a
    /// `system.error` is emitted describing the drop — the producer is
    /// never blocked (spec §4.2).
    pub fn publish(&self, event_type: impl Into<String>, payload: Value, source: impl Into<String>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let event_type = event_type.into();
        let event = Event::new(event_type.clone(), payload, source);

        let tx_guard = self.tx.lock();
        let Some(tx) = tx_guard.as_ref() else { return };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(event_type = %dropped.event_type, "event bus queue full, dropping event");
                let overflow = Event::new(
                    "system.error",
                    serde_json::json!({
                        "code": "bus_overflow",
                        "message": format!("queue full, dropped {}", dropped.event_type),
                    }),
                    "bus",
                );
                let _ = self.diag_tx.send(overflow);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Register a handler for `event_type`. If `filter` is `Some`, an event
    /// matches only when every filter key is present in its payload with an
    /// equal value.
    pub fn subscribe<F>(
        &self,
        event_type: impl Into<String>,
        filter: Option<HashMap<String, Value>>,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.subscriptions.write().push(Subscription {
            id,
            event_type: event_type.into(),
            handler: Arc::new(handler),
            filter,
            fault_count: AtomicU32::new(0),
        });
        id
    }

    /// Idempotent — removing an id that isn't registered is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.write().retain(|s| s.id != id);
    }

    /// A raw feed of every event published, regardless of subscriptions.
    /// Used by the emulator surface relay and diagnostics; never by mini-apps.
    pub fn relay_subscribe(&self) -> broadcast::Receiver<Event> {
        self.relay_tx.subscribe()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drains the queue up to `deadline`, then stops the worker. Further
    /// `publish` calls are a no-op after this returns.
    pub async fn stop(&self, deadline: Duration) {
        self.stopped.store(true, Ordering::SeqCst);
        let deadline_at = tokio::time::Instant::now() + deadline;
        if let Some(tx) = self.tx.lock().clone() {
            while tx.capacity() < self.capacity && tokio::time::Instant::now() < deadline_at {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        self.shutdown.cancel();
        if let Some(handle) = self.worker.lock().take() {
            let remaining = deadline_at.saturating_duration_since(tokio::time::Instant::now());
            let _ = tokio::time::timeout(remaining.max(Duration::from_millis(10)), handle).await;
        }
        *self.tx.lock() = None;
    }
}

/// Adapter so `boss_hal` backends can publish onto this bus without
/// depending on the `boss` crate.
pub struct BusEventSink(pub Arc<EventBus>);

impl boss_hal::EventSink for BusEventSink {
    fn publish(&self, event_type: &'static str, payload: Value, source: &str) {
        self.0.publish(event_type, payload, source.to_owned());
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
