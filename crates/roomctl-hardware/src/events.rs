//! Health-change distribution.
//!
//! Every module publishes into one shared [`EventBus`]. Publishing never
//! blocks and never fails: with no subscribers the event is dropped, and a
//! subscriber that falls more than [`HEALTH_EVENT_CAPACITY`] events behind
//! loses the oldest ones.

use roomctl_core::constants::HEALTH_EVENT_CAPACITY;
use roomctl_core::{HealthChangeEvent, ModuleKind};
use tokio::sync::broadcast;
use tracing::{Span, info_span, trace};

/// Broadcast bus for [`HealthChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HealthChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(HEALTH_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fire-and-forget delivery to current subscribers.
    pub fn publish(&self, event: HealthChangeEvent) {
        if self.sender.send(event).is_err() {
            trace!("Health event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Collaborators handed to a module at construction.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub events: EventBus,
    /// Parent span of everything the module logs, including its background
    /// tasks.
    pub span: Span,
}

impl ModuleContext {
    pub fn new(kind: ModuleKind, events: EventBus) -> Self {
        Self {
            events,
            span: info_span!("module", module = %kind),
        }
    }
}
