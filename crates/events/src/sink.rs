//! Outbound event sink (fire-and-forget publication boundary).
//!
//! The sink is a capability injected into the billing core. Publication is
//! best-effort: the core never blocks on or inspects the result, so the
//! trait returns nothing. Delivery guarantees (retries, fan-out, transport)
//! live entirely on the other side of this boundary.

use std::sync::Mutex;

use tracing::warn;

use crate::event::Event;

/// Publish-only event boundary.
pub trait EventSink<E: Event>: Send + Sync {
    /// Hand an event to the outside world. Must not fail the caller.
    fn publish(&self, event: E);
}

/// Sink that drops everything (dev/wiring default).
#[derive(Debug, Default)]
pub struct NullEventSink;

impl<E: Event> EventSink<E> for NullEventSink {
    fn publish(&self, _event: E) {}
}

/// Sink that records published events in memory.
///
/// Used by tests to assert exactly which events crossed the core's edge.
#[derive(Debug)]
pub struct RecordingEventSink<E> {
    events: Mutex<Vec<E>>,
}

impl<E> RecordingEventSink<E> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Default for RecordingEventSink<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> RecordingEventSink<E> {
    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<E> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Drain recorded events (test isolation between phases).
    pub fn drain(&self) -> Vec<E> {
        match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl<E: Event> EventSink<E> for RecordingEventSink<E> {
    fn publish(&self, event: E) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            // A poisoned lock means a test already panicked; dropping the
            // event here is acceptable for a fire-and-forget boundary.
            Err(_) => warn!(event_type = %event.event_type(), "recording sink poisoned, event dropped"),
        }
    }
}
