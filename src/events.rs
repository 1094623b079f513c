use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Operational events emitted by the locker service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LockerEvent {
    /// An open-request was accepted and queued for physical dispatch
    OpenRequested { id: u32, timestamp: DateTime<Utc> },
    /// The hardware poller collected a locker id from the queue
    Dispatched { id: u32, timestamp: DateTime<Utc> },
}

impl LockerEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LockerEvent::OpenRequested { timestamp, .. } => *timestamp,
            LockerEvent::Dispatched { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            LockerEvent::OpenRequested { .. } => "open_requested",
            LockerEvent::Dispatched { .. } => "dispatched",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            LockerEvent::OpenRequested { id, .. } => {
                format!("Locker {} queued for opening", id)
            }
            LockerEvent::Dispatched { id, .. } => {
                format!("Locker {} handed to poller", id)
            }
        }
    }
}

/// Broadcast bus for service events.
///
/// Publishing with no subscribers is a normal condition: the event is
/// dropped and the polling contract is unaffected.
pub struct EventBus {
    sender: broadcast::Sender<LockerEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: LockerEvent) -> usize {
        if self.debug_logging {
            debug!("Event published: {}", event.description());
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<LockerEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
