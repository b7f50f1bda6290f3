//! In-process note store.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{NoteStore, SnapshotHub, Subscription};
use crate::error::{Error, Result};
use crate::models::{Note, NoteFields, NoteId, NotePatch};

/// A write received by the store, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Add(NoteId),
    SetMerge(NoteId, NotePatch),
    Delete(NoteId),
}

#[derive(Default)]
struct Inner {
    docs: Mutex<Vec<(NoteId, NoteFields)>>,
    calls: Mutex<Vec<StoreCall>>,
    hub: Arc<SnapshotHub>,
    offline: AtomicBool,
    failures_pending: AtomicU32,
}

/// Note store kept in process memory.
///
/// Clones share the same collection, so a test can keep a handle while a
/// controller owns another.
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    inner: Arc<Inner>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `notes`
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let store = Self::new();
        {
            let mut docs = store.docs();
            for note in notes {
                let fields = note.fields();
                docs.push((note.id, fields));
            }
        }
        store
    }

    /// Current contents in storage order
    pub fn snapshot(&self) -> Vec<Note> {
        self.docs()
            .iter()
            .map(|(id, fields)| Note::from_fields(id.clone(), fields.clone()))
            .collect()
    }

    /// Look up one document
    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.docs()
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, fields)| Note::from_fields(doc_id.clone(), fields.clone()))
    }

    /// Every write accepted so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge writes accepted so far, as `(id, body)` pairs
    pub fn body_writes(&self) -> Vec<(NoteId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::SetMerge(id, patch) => patch.body.map(|body| (id, body)),
                _ => None,
            })
            .collect()
    }

    /// Simulate losing (or regaining) connectivity
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` writes with `StoreUnavailable`
    pub fn fail_next_writes(&self, count: u32) {
        self.inner.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Push a stream error to every subscriber
    pub fn publish_error(&self, message: impl Into<String>) {
        self.inner.hub.publish_error(message);
    }

    /// Apply a change as if another client had made it
    pub fn apply_remote(&self, note: Note) {
        {
            let mut docs = self.docs();
            if let Some((_, fields)) = docs.iter_mut().find(|(id, _)| *id == note.id) {
                *fields = note.fields();
            } else {
                let fields = note.fields();
                docs.push((note.id, fields));
            }
        }
        self.publish();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.subscriber_count()
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("store is offline".to_string()));
        }
        let consumed = self
            .inner
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if consumed {
            return Err(Error::StoreUnavailable("transient store failure".to_string()));
        }
        Ok(())
    }

    fn record(&self, call: StoreCall) {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.inner.hub.publish(&snapshot);
    }

    fn docs(&self) -> MutexGuard<'_, Vec<(NoteId, NoteFields)>> {
        self.inner
            .docs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl NoteStore for MemoryNoteStore {
    async fn add(&self, fields: NoteFields) -> Result<NoteId> {
        self.check_available()?;
        let id = NoteId::generate();
        self.docs().push((id.clone(), fields));
        self.record(StoreCall::Add(id.clone()));
        self.publish();
        Ok(id)
    }

    async fn set_merge(&self, id: &NoteId, patch: NotePatch) -> Result<()> {
        self.check_available()?;
        let found = {
            let mut docs = self.docs();
            docs.iter_mut()
                .find(|(doc_id, _)| doc_id == id)
                .map(|(doc_id, fields)| {
                    let mut note = Note::from_fields(doc_id.clone(), fields.clone());
                    note.apply(&patch);
                    *fields = note.fields();
                })
                .is_some()
        };
        self.record(StoreCall::SetMerge(id.clone(), patch));
        if found {
            self.publish();
        } else {
            tracing::debug!(note_id = %id, "Ignoring merge write for missing document");
        }
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.check_available()?;
        self.docs().retain(|(doc_id, _)| doc_id != id);
        self.record(StoreCall::Delete(id.clone()));
        self.publish();
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::Subscription("store is offline".to_string()));
        }
        Ok(self.inner.hub.subscribe(self.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotEvent;

    #[tokio::test]
    async fn add_assigns_id_and_publishes() {
        let store = MemoryNoteStore::new();
        let mut sub = store.subscribe().await.unwrap();
        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(Vec::new())));

        let id = store.add(NoteFields::with_body("hello")).await.unwrap();

        let Some(SnapshotEvent::Snapshot(notes)) = sub.next().await else {
            panic!("expected snapshot");
        };
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].body, "hello");
    }

    #[tokio::test]
    async fn set_merge_preserves_unspecified_fields() {
        let store = MemoryNoteStore::new();
        let id = store.add(NoteFields::with_body("one")).await.unwrap();
        let created_at = store.get(&id).unwrap().created_at;

        store
            .set_merge(
                &id,
                NotePatch {
                    body: Some("two".to_string()),
                    updated_at: None,
                },
            )
            .await
            .unwrap();

        let note = store.get(&id).unwrap();
        assert_eq!(note.body, "two");
        assert_eq!(note.created_at, created_at);
    }

    #[tokio::test]
    async fn set_merge_on_missing_document_does_not_create_it() {
        let store = MemoryNoteStore::new();
        store
            .set_merge(&NoteId::from("gone"), NotePatch::body("late"))
            .await
            .unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryNoteStore::new();
        store.fail_next_writes(1);
        assert!(matches!(
            store.add(NoteFields::new_default()).await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(store.add(NoteFields::new_default()).await.is_ok());
    }

    #[tokio::test]
    async fn offline_store_rejects_writes_and_subscriptions() {
        let store = MemoryNoteStore::new();
        store.set_offline(true);
        assert!(store.delete(&NoteId::from("x")).await.is_err());
        assert!(matches!(
            store.subscribe().await,
            Err(Error::Subscription(_))
        ));
        assert!(store.calls().is_empty());
    }
}
