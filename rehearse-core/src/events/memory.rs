//! In-memory EventBus implementation

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use super::SessionEvent;
use super::bus::{EventBus, EventSeq};

/// Keeps every event in a Vec for replay and fans out to live subscribers
/// over a broadcast channel.
pub struct MemoryEventBus {
    events: RwLock<Vec<(EventSeq, SessionEvent)>>,
    next_seq: AtomicU64,
    tx: broadcast::Sender<(EventSeq, SessionEvent)>,
}

impl MemoryEventBus {
    /// Create a bus whose live channel buffers `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            events: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            tx,
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: SessionEvent) -> EventSeq {
        // Hold the write lock while assigning so replay order matches seq order
        let mut events = self.events.write().await;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        events.push((seq, event.clone()));
        drop(events);

        // No receivers is fine
        let _ = self.tx.send((seq, event));
        seq
    }

    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, SessionEvent)> {
        self.tx.subscribe()
    }

    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, SessionEvent)> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(s, _)| *s >= seq)
            .cloned()
            .collect()
    }

    async fn session_events(&self, session_id: &str) -> Vec<(EventSeq, SessionEvent)> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(_, event)| event.session_id() == session_id)
            .cloned()
            .collect()
    }

    fn current_seq(&self) -> EventSeq {
        self.next_seq.load(Ordering::SeqCst)
    }
}
