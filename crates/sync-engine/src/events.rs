//! Notifications for connected editors
//!
//! The engine reports what it did through an [`EventSink`]; the server
//! fans those events out to whoever is listening.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Trait for publishing sync events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered.
    fn send(&self, event: SyncEvent) -> Result<(), EventError>;
}

/// Why an event could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Nobody is subscribed
    #[error("No receivers")]
    NoReceivers,

    /// A collecting sink's lock was poisoned
    #[error("Event log poisoned")]
    Poisoned,
}

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Files were (re)written from the flow document
    FilesExtracted { files: Vec<String> },

    /// One file was saved through the editor
    FileUpdated { filename: String, content: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: SyncEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<SyncEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: SyncEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::Poisoned)?
            .push(event);
        Ok(())
    }
}

/// Event sink backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<SyncEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a listener
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSink for BroadcastEventSink {
    fn send(&self, event: SyncEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| EventError::NoReceivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SyncEvent::FilesExtracted {
            files: vec!["f1.js".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "filesExtracted");
        assert_eq!(json["files"][0], "f1.js");
    }

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(SyncEvent::FilesExtracted { files: vec![] }).unwrap();
        sink.send(SyncEvent::FileUpdated {
            filename: "f1.js".to_string(),
            content: "x".to_string(),
        })
        .unwrap();
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_sink() {
        let sink = BroadcastEventSink::default();
        let err = sink.send(SyncEvent::FilesExtracted { files: vec![] }).unwrap_err();
        assert_eq!(err, EventError::NoReceivers);
        assert_eq!(err.to_string(), "No receivers");

        let mut rx = sink.subscribe();
        sink.send(SyncEvent::FilesExtracted { files: vec![] }).unwrap();
        assert_eq!(rx.recv().await.unwrap(), SyncEvent::FilesExtracted { files: vec![] });
    }
}
