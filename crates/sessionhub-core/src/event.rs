//! Internal event bus using tokio::broadcast
//!
//! Repurposed from a UI redraw-trigger bus into internal fan-out for
//! smart-recap lifecycle notifications (SPEC_FULL.md
//! §12). Not a public contract: no SSE route is wired to it in this repo
//! (out of scope per spec.md §1), but the coordinator publishes through it so
//! a future subscriber (tests, a status endpoint) can observe generation
//! start/finish without reaching into the coordinator's internals.

use sessionhub_types::SessionId;
use tokio::sync::broadcast;

/// Events emitted by the smart-recap coordinator.
#[derive(Debug, Clone)]
pub enum RecapEvent {
    Started(SessionId),
    Completed(SessionId),
    Failed(SessionId, String),
}

/// Broadcast bus for recap lifecycle events.
pub struct EventBus {
    sender: broadcast::Sender<RecapEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn default_capacity() -> Self {
        Self::new(256)
    }

    /// Publish an event to all subscribers. Ignores send errors (no
    /// subscribers is a normal, not exceptional, state.
    pub fn publish(&self, event: RecapEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecapEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
