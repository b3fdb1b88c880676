use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about something that happened.
///
/// Events are emitted outward for notification/reporting collaborators; the
/// billing core itself never consumes what it publishes.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable, dot-separated event type (e.g. `"billing.invoice.created"`).
    fn event_type(&self) -> &'static str;

    /// Schema version of the event payload.
    fn version(&self) -> u32;

    /// When the underlying fact occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
