//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// Trait for sinks that receive reconciliation events.
///
/// Emission must never fail or panic; sinks swallow their own errors.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "version.uploaded")
    /// * `data` - Optional event data
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        if self.level >= Level::DEBUG {
            debug!(event = event_type, data = %data, "Reconciliation event");
        } else if self.level <= Level::WARN {
            warn!(event = event_type, data = %data, "Reconciliation event");
        } else {
            info!(event = event_type, data = %data, "Reconciliation event");
        }
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name, one of [`event_types`](super::event_types).
    pub event_type: String,
    /// Payload passed with the event.
    pub data: Option<serde_json::Value>,
}

/// Sink that keeps every event in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the captured events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Returns the captured event names in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Counts events named exactly `event_type`.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Returns the payloads of events named exactly `event_type`.
    #[must_use]
    pub fn payloads(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .filter_map(|e| e.data.clone())
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push(RecordedEvent {
            event_type: event_type.to_string(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit("test", Some(serde_json::json!({"x": 1})));
    }

    #[test]
    fn test_logging_sink() {
        let sink = LoggingEventSink::default();
        sink.emit("version.uploaded", Some(serde_json::json!({"version": "v1"})));
        LoggingEventSink::debug().emit("version.found", None);
    }

    #[test]
    fn test_collecting_sink_keeps_order_and_payloads() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("version.conflict", Some(serde_json::json!({"attempt": 1})));
        sink.emit("version.deleted", None);
        sink.emit("version.conflict", Some(serde_json::json!({"attempt": 2})));

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_types(),
            vec!["version.conflict", "version.deleted", "version.conflict"]
        );
        assert_eq!(sink.events()[1].data, None);
        assert_eq!(
            sink.payloads("version.conflict"),
            vec![serde_json::json!({"attempt": 1}), serde_json::json!({"attempt": 2})]
        );
    }

    #[test]
    fn test_collecting_sink_count_is_exact() {
        let sink = CollectingEventSink::new();
        sink.emit("version.upload_failed", None);
        sink.emit("version.uploaded", None);

        assert_eq!(sink.count("version.uploaded"), 1);
        assert_eq!(sink.count("version.upload"), 0);
    }
}
