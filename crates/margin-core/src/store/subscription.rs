//! Snapshot fan-out shared by note store implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::Note;

/// One delivery on a snapshot subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEvent {
    /// Full current set of documents
    Snapshot(Vec<Note>),
    /// The stream failed; the subscription may recover with a later snapshot
    Error(String),
}

/// Registry of live subscribers.
///
/// Store implementations hold it in an `Arc` and publish after every change.
#[derive(Default)]
pub struct SnapshotHub {
    subscribers: Mutex<Vec<(u64, UnboundedSender<SnapshotEvent>)>>,
    next_id: AtomicU64,
}

impl SnapshotHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a subscriber, delivering `initial` as its first event.
    pub fn subscribe(self: &Arc<Self>, initial: Vec<Note>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(SnapshotEvent::Snapshot(initial));
        self.lock().push((id, tx));
        tracing::debug!(subscription_id = id, "Snapshot subscription acquired");
        Subscription {
            hub: Arc::downgrade(self),
            id,
            rx,
        }
    }

    /// Deliver a full snapshot to every subscriber
    pub fn publish(&self, snapshot: &[Note]) {
        self.broadcast(&SnapshotEvent::Snapshot(snapshot.to_vec()));
    }

    /// Deliver a stream error to every subscriber
    pub fn publish_error(&self, message: impl Into<String>) {
        self.broadcast(&SnapshotEvent::Error(message.into()));
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn broadcast(&self, event: &SnapshotEvent) {
        // Receivers that went away without unsubscribing are pruned here.
        self.lock().retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().retain(|(existing, _)| *existing != id);
        tracing::debug!(subscription_id = id, "Snapshot subscription released");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, UnboundedSender<SnapshotEvent>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Handle to a live snapshot stream.
///
/// Hold it to keep receiving snapshots; dropping it releases the
/// registration on every exit path.
pub struct Subscription {
    hub: Weak<SnapshotHub>,
    id: u64,
    rx: UnboundedReceiver<SnapshotEvent>,
}

impl Subscription {
    /// Wait for the next event. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteId;

    fn note(id: &str) -> Note {
        Note {
            id: NoteId::from(id),
            body: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn first_event_is_initial_snapshot() {
        let hub = SnapshotHub::new();
        let mut sub = hub.subscribe(vec![note("a")]);
        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(vec![note("a")])));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = SnapshotHub::new();
        let mut sub = hub.subscribe(Vec::new());
        hub.publish(&[note("a")]);
        hub.publish_error("boom");
        hub.publish(&[note("b")]);

        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(Vec::new())));
        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(vec![note("a")])));
        assert_eq!(sub.next().await, Some(SnapshotEvent::Error("boom".to_string())));
        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(vec![note("b")])));
    }

    #[test]
    fn drop_releases_registration() {
        let hub = SnapshotHub::new();
        let first = hub.subscribe(Vec::new());
        let second = hub.subscribe(Vec::new());
        assert_eq!(hub.subscriber_count(), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(), 1);
        drop(second);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn release_happens_on_unwind() {
        let hub = SnapshotHub::new();
        let hub_for_panic = Arc::clone(&hub);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _sub = hub_for_panic.subscribe(Vec::new());
            panic!("view crashed");
        }));
        assert!(result.is_err());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn stream_ends_when_hub_is_gone() {
        let hub = SnapshotHub::new();
        let mut sub = hub.subscribe(Vec::new());
        drop(hub);
        assert!(sub.next().await.is_some());
        assert_eq!(sub.next().await, None);
    }
}
