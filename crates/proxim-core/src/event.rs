use serde::{Deserialize, Serialize};

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::Report;

/// Events flowing out of the registry and transport toward the host.
///
/// All variants are fired on whatever task observed the change; a host UI
/// is responsible for hopping onto its own display thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    // ── Device lifecycle (registry) ────────────────────────────
    DeviceAdded {
        device_id: String,
    },
    DeviceUpdated {
        device_id: String,
        report: Report,
    },
    DeviceRemoved {
        device_id: String,
    },

    // ── Connection lifecycle (transport) ───────────────────────
    PeerConnected {
        conn_id: u64,
        addr: String,
    },
    PeerDisconnected {
        conn_id: u64,
    },

    // ── Free-form status text ──────────────────────────────────
    StatusChanged {
        status: String,
    },
}

/// A broadcast-based event bus shared by the registry and the transport.
///
/// Publishes are synchronous and never coalesced, so subscribers observe
/// events in publish order (per publisher).
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: Event) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish a [`Event::StatusChanged`] with the given text.
    pub fn status(&self, status: impl Into<String>) {
        self.publish(Event::StatusChanged {
            status: status.into(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
