//! EventBus trait definition

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::SessionEvent;

/// Sequence number for events (monotonically increasing)
pub type EventSeq = u64;

/// Publishes session lifecycle events and keeps them for replay.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event, returns its sequence number
    async fn publish(&self, event: SessionEvent) -> EventSeq;

    /// Live stream of events published from now on
    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, SessionEvent)>;

    /// Events with a sequence number at or after `seq`
    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, SessionEvent)>;

    /// Every event recorded for one session, in publish order
    async fn session_events(&self, session_id: &str) -> Vec<(EventSeq, SessionEvent)>;

    /// Next sequence number to be assigned
    fn current_seq(&self) -> EventSeq;
}
