//! Domain event plumbing: the `Event` trait and the outbound sink boundary.

pub mod event;
pub mod sink;

pub use event::Event;
pub use sink::{EventSink, NullEventSink, RecordingEventSink};
