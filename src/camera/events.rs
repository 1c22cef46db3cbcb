//! Lifecycle observers
//!
//! Handlers are registered per [`EventKind`] and invoked synchronously, in
//! registration order, on the task that triggered the event. They receive
//! owned payloads, so nothing a handler does can reach back into the
//! controller's state.

use crate::camera::state::CameraState;
use crate::camera::types::{CameraSettings, DeviceDescriptor, Resolution};
use crate::error::CameraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Event categories a handler can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Any state patch was applied
    StateChanged,
    /// A stream started successfully
    Started,
    /// A stream was stopped
    Stopped,
    /// Live track settings changed
    SettingsChanged,
    /// The device cache was rebuilt
    DevicesChanged,
    /// A still was captured
    PhotoCaptured,
    /// The error handler saw a failure
    Error,
}

/// Event payloads
#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// Snapshot taken right after the patch was applied
    StateChanged(Box<CameraState>),
    /// Stream is running
    Started {
        /// Device behind the stream
        device: Option<DeviceDescriptor>,
        /// Reconciled resolution
        resolution: Option<Resolution>,
    },
    /// Stream was torn down
    Stopped,
    /// Settings now in effect
    SettingsChanged(CameraSettings),
    /// Fresh device list
    DevicesChanged(Vec<DeviceDescriptor>),
    /// Still captured
    PhotoCaptured {
        /// Output width
        width: u32,
        /// Output height
        height: u32,
    },
    /// Reported failure
    Error(CameraError),
}

impl CameraEvent {
    /// Category of this event
    pub fn kind(&self) -> EventKind {
        match self {
            CameraEvent::StateChanged(_) => EventKind::StateChanged,
            CameraEvent::Started { .. } => EventKind::Started,
            CameraEvent::Stopped => EventKind::Stopped,
            CameraEvent::SettingsChanged(_) => EventKind::SettingsChanged,
            CameraEvent::DevicesChanged(_) => EventKind::DevicesChanged,
            CameraEvent::PhotoCaptured { .. } => EventKind::PhotoCaptured,
            CameraEvent::Error(_) => EventKind::Error,
        }
    }
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observer callback
pub type EventHandler = Arc<dyn Fn(&CameraEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: EventHandler,
}

/// Registry of observers
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscriptions.push(Subscription { id, kind, handler });
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Whether anyone listens for `kind`
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.subscriptions.iter().any(|s| s.kind == kind)
    }

    /// Deliver an event to every matching handler
    pub fn emit(&self, event: &CameraEvent) {
        let kind = event.kind();
        for subscription in self.subscriptions.iter().filter(|s| s.kind == kind) {
            (subscription.handler)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<EventKind>>>, EventHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: EventHandler = Arc::new(move |event: &CameraEvent| {
            sink.lock().unwrap().push(event.kind());
        });
        (seen, handler)
    }

    #[test]
    fn test_emit_reaches_only_matching_kind() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe(EventKind::Stopped, handler);

        bus.emit(&CameraEvent::Stopped);
        bus.emit(&CameraEvent::PhotoCaptured {
            width: 1,
            height: 1,
        });

        assert_eq!(*seen.lock().unwrap(), vec![EventKind::Stopped]);
        assert!(bus.has_listeners(EventKind::Stopped));
        assert!(!bus.has_listeners(EventKind::Error));
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        let id = bus.subscribe(EventKind::Stopped, handler);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&CameraEvent::Stopped);

        assert!(seen.lock().unwrap().is_empty());
        assert!(bus.is_empty());
    }

    #[test]
    fn test_clear_and_ids_are_unique() {
        let mut bus = EventBus::new();
        let (_, handler) = recorder();
        let a = bus.subscribe(EventKind::Error, Arc::clone(&handler));
        let b = bus.subscribe(EventKind::Error, handler);
        assert_ne!(a, b);
        assert_eq!(bus.len(), 2);

        bus.clear();
        assert!(bus.is_empty());
    }
}
