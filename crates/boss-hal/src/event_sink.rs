// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// The narrow interface a HAL backend needs to report hardware-originated
/// events. The real implementation (`boss::bus::EventBus`) lives in the
/// downstream `boss` crate; this trait is the seam that lets the orchestrator
/// hand the bus down into the HAL without `boss-hal` depending on `boss` (the
/// message cycle the HAL-and-bus relationship forms per spec §9 is wired by
/// the composition root, never by one crate depending on the other).
pub trait EventSink: Send + Sync {
    fn publish(&self, event_type: &'static str, payload: serde_json::Value, source: &str);
}

/// An `EventSink` that discards everything. Useful for constructing a backend
/// in isolation (unit tests) without wiring a full bus.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event_type: &'static str, _payload: serde_json::Value, _source: &str) {}
}
