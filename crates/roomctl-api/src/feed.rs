//! Recent health changes for the diagnostics panel.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use roomctl_core::HealthChangeEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Ring buffer of the last `capacity` health events, oldest first.
#[derive(Debug, Clone)]
pub struct HealthFeed {
    events: Arc<Mutex<VecDeque<HealthChangeEvent>>>,
    capacity: usize,
}

impl HealthFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, event: HealthChangeEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot, newest last.
    pub fn recent(&self) -> Vec<HealthChangeEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Record everything published on `events` until the bus closes.
    pub fn spawn(&self, mut events: broadcast::Receiver<HealthChangeEvent>) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => feed.push(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Health feed fell behind, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Health feed stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomctl_core::{DeviceHealth, DeviceId, ModuleKind};

    fn event(id: &str) -> HealthChangeEvent {
        HealthChangeEvent {
            module: ModuleKind::Display,
            device_id: DeviceId::new(id).unwrap(),
            previous: DeviceHealth::Offline,
            current: DeviceHealth::Healthy,
            timestamp: Default::default(),
            error: None,
        }
    }

    #[test]
    fn test_ring_keeps_newest() {
        let feed = HealthFeed::new(2);
        for id in ["a", "b", "c"] {
            feed.push(event(id));
        }

        let ids: Vec<_> = feed
            .recent()
            .into_iter()
            .map(|e| e.device_id.as_str().to_string())
            .collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_spawned_feed_follows_bus() {
        let (tx, rx) = broadcast::channel(8);
        let feed = HealthFeed::new(10);
        let task = feed.spawn(rx);

        tx.send(event("wall")).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(feed.recent().len(), 1);
    }
}
