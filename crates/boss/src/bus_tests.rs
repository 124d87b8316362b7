// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::*;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn delivers_to_matching_subscriber() {
    let bus = EventBus::start(16);
    let received = Arc::new(AtomicUsize::new(0));
    let received2 = Arc::clone(&received);
    bus.subscribe("input.button.pressed", None, move |_event| {
        received2.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish("input.button.pressed", serde_json::json!({"button": "go"}), "test");
    settle().await;

    assert_eq!(received.load(Ordering::SeqCst), 1);
    bus.stop(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn filter_requires_exact_match() {
    let bus = EventBus::start(16);
    let received = Arc::new(AtomicUsize::new(0));
    let received2 = Arc::clone(&received);
    let mut filter = HashMap::new();
    filter.insert("button".to_owned(), serde_json::json!("red"));
    bus.subscribe("input.button.pressed", Some(filter), move |_e| {
        received2.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish("input.button.pressed", serde_json::json!({"button": "blue"}), "test");
    bus.publish("input.button.pressed", serde_json::json!({"button": "red"}), "test");
    settle().await;

    assert_eq!(received.load(Ordering::SeqCst), 1);
    bus.stop(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_stops_delivery() {
    let bus = EventBus::start(16);
    let received = Arc::new(AtomicUsize::new(0));
    let received2 = Arc::clone(&received);
    let id = bus.subscribe("system.error", None, move |_e| {
        received2.fetch_add(1, Ordering::SeqCst);
    });

    bus.unsubscribe(id);
    bus.unsubscribe(id); // idempotent
    bus.publish("system.error", serde_json::json!({"code": "x", "message": "y"}), "test");
    settle().await;

    assert_eq!(received.load(Ordering::SeqCst), 0);
    bus.stop(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn a_panicking_handler_does_not_block_others_or_later_events() {
    let bus = EventBus::start(16);
    let second_count = Arc::new(AtomicUsize::new(0));
    let second_count2 = Arc::clone(&second_count);

    bus.subscribe("input.button.pressed", None, |_e| {
        panic!("boom");
    });
    bus.subscribe("input.button.pressed", None, move |_e| {
        second_count2.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish("input.button.pressed", serde_json::json!({"button": "go"}), "test");
    bus.publish("input.button.pressed", serde_json::json!({"button": "go"}), "test");
    settle().await;

    assert_eq!(second_count.load(Ordering::SeqCst), 2);
    bus.stop(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn overflow_drops_newest_and_emits_system_error() {
    let bus = EventBus::start(1);
    let mut relay = bus.relay_subscribe();

    // Fill the single queue slot, then force an overflow with no worker
    // draining yet by publishing rapidly. The worker is async so this is
    // racy in principle; we assert on the overflow path by publishing many
    // events back-to-back and confirming at least one system.error with
    // code "bus_overflow" or all events land — either way the bus never panics.
    for i in 0..50u8 {
        bus.publish("input.switch.changed", serde_json::json!({"old_value": 0, "new_value": i}), "test");
    }
    settle().await;

    let mut saw_any = false;
    while let Ok(event) = relay.try_recv() {
        saw_any = true;
        if event.event_type == "system.error" {
            assert_eq!(event.payload["code"], "bus_overflow");
        }
    }
    assert!(saw_any);
    bus.stop(Duration::from_millis(200)).await;
}

fn small_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (0i32..5).prop_map(Value::from),
        "[a-c]".prop_map(Value::from),
    ]
}

fn small_map_strategy() -> impl Strategy<Value = HashMap<String, Value>> {
    prop::collection::hash_map("[xyz]", small_value_strategy(), 0..4)
}

proptest! {
    /// Spec §3: "`payload_filter` is a map; an event matches iff every key in
    /// the filter is present in the payload with an equal value." Checked
    /// against the direct definition rather than the implementation, across
    /// randomly generated filters and payloads (including the no-filter case).
    #[test]
    fn subscription_matches_iff_every_filter_key_is_present_and_equal(
        filter in small_map_strategy(),
        payload in small_map_strategy(),
    ) {
        let sub = Subscription {
            id: Uuid::new_v4(),
            event_type: "t".to_owned(),
            handler: Arc::new(|_event: &Event| {}),
            filter: Some(filter.clone()),
            fault_count: AtomicU32::new(0),
        };
        let payload_value = Value::Object(payload.into_iter().collect());
        let event = Event::new("t", payload_value.clone(), "test");

        let expected = filter.iter().all(|(k, v)| payload_value.get(k) == Some(v));
        prop_assert_eq!(sub.matches(&event), expected);
    }

    /// A subscription with no filter matches every event of its own type,
    /// regardless of payload.
    #[test]
    fn no_filter_always_matches_same_type(payload in small_map_strategy()) {
        let sub = Subscription {
            id: Uuid::new_v4(),
            event_type: "t".to_owned(),
            handler: Arc::new(|_event: &Event| {}),
            filter: None,
            fault_count: AtomicU32::new(0),
        };
        let event = Event::new("t", Value::Object(payload.into_iter().collect()), "test");
        prop_assert!(sub.matches(&event));
    }
}

#[tokio::test]
async fn after_stop_publish_is_a_no_op() {
    let bus = EventBus::start(16);
    bus.stop(Duration::from_millis(100)).await;
    let mut relay = bus.relay_subscribe();
    bus.publish("system.error", serde_json::json!({"code": "x", "message": "y"}), "test");
    settle().await;
    assert!(relay.try_recv().is_err());
}
