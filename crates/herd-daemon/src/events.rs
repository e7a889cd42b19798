//! Event emission system.
//!
//! Events are pushed from the daemon to subscribers as JSON-RPC
//! notifications on the connection that called `subscribe_events`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const DAEMON_STARTED: &str = "daemon_started";
pub const LIVESTOCK_REGISTERED: &str = "livestock_registered";
pub const LIVESTOCK_UPDATED: &str = "livestock_updated";
pub const SPLIT_CONFIG_SAVED: &str = "split_config_saved";
pub const SETTLEMENT_COMMITTED: &str = "settlement_committed";
pub const SETTLEMENT_REJECTED: &str = "settlement_rejected";
pub const BOOKKEEPING_PENDING: &str = "bookkeeping_pending";

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "settlement_committed").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, timestamp: u64, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp,
            payload,
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "livestock", "settlement", "system".
    pub categories: Option<Vec<String>>,
    /// Only events whose payload names one of these assets.
    pub asset_ids: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let event_category = categorize_event(&event.event_type);
            if !categories.iter().any(|c| c == event_category) {
                return false;
            }
        }

        if let Some(ref asset_ids) = self.asset_ids {
            match event.payload.get("asset_id").and_then(|v| v.as_str()) {
                Some(id) if asset_ids.iter().any(|a| a == id) => {}
                _ => return false,
            }
        }

        true
    }
}

fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("livestock_") => "livestock",
        s if s.starts_with("settlement_")
            || s.starts_with("bookkeeping_")
            || s.starts_with("split_config_") =>
        {
            "settlement"
        }
        _ => "system",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event::new(DAEMON_STARTED, 1000, serde_json::json!({"version": "0.1.0"})));

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, DAEMON_STARTED);
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(Event::new(DAEMON_STARTED, 1, serde_json::Value::Null));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_categories() {
        let filter = EventFilter {
            categories: Some(vec!["settlement".to_string()]),
            asset_ids: None,
        };

        let committed = Event::new(SETTLEMENT_COMMITTED, 1000, serde_json::json!({}));
        assert!(filter.matches(&committed));

        let registered = Event::new(LIVESTOCK_REGISTERED, 1000, serde_json::json!({}));
        assert!(!filter.matches(&registered));
    }

    #[test]
    fn test_event_filter_asset_ids() {
        let filter = EventFilter {
            categories: None,
            asset_ids: Some(vec!["cow-1".to_string()]),
        };
        assert!(filter.matches(&Event::new(
            LIVESTOCK_UPDATED,
            1,
            serde_json::json!({"asset_id": "cow-1"})
        )));
        assert!(!filter.matches(&Event::new(
            LIVESTOCK_UPDATED,
            1,
            serde_json::json!({"asset_id": "cow-2"})
        )));
        assert!(!filter.matches(&Event::new(DAEMON_STARTED, 1, serde_json::json!({}))));
    }

    #[test]
    fn test_categorize_event() {
        assert_eq!(categorize_event(LIVESTOCK_REGISTERED), "livestock");
        assert_eq!(categorize_event(SETTLEMENT_REJECTED), "settlement");
        assert_eq!(categorize_event(BOOKKEEPING_PENDING), "settlement");
        assert_eq!(categorize_event(SPLIT_CONFIG_SAVED), "settlement");
        assert_eq!(categorize_event(DAEMON_STARTED), "system");
    }
}
