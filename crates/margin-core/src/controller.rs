//! Sync controller: owns the note list, the selection and the edit buffer.
//!
//! The controller mediates between the local cache, the note store and the
//! view. The store is the source of truth once its snapshots arrive; every
//! successful write is mirrored locally right away so the view never waits
//! for the round trip.

use std::time::Duration;

use tokio::time::Instant;

use crate::buffer::{EditBuffer, Flush, DEFAULT_DEBOUNCE};
use crate::cache::{CacheSlot, NoteCache};
use crate::error::{Error, Result};
use crate::models::{
    dedup_notes, display_order, first_in_display_order, Note, NoteFields, NoteId, NotePatch,
};
use crate::retry::{with_retry, RetryPolicy};
use crate::state::SyncState;
use crate::store::{NoStore, NoteStore};

/// Tuning for a [`SyncController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period before buffered edits are written
    pub debounce: Duration,
    /// Write unflushed edits to the old note before switching selection
    pub flush_on_switch: bool,
    /// Retry policy for store writes
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            flush_on_switch: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Client-side state for one note collection.
pub struct SyncController<C, S = NoStore> {
    cache: NoteCache<C>,
    store: Option<S>,
    notes: Vec<Note>,
    current_note_id: Option<NoteId>,
    buffer: EditBuffer,
    state: SyncState,
    last_error: Option<String>,
    settings: SyncSettings,
}

impl<C: CacheSlot> SyncController<C, NoStore> {
    /// Open in local-only mode: notes live in the cache alone.
    pub async fn open(cache: NoteCache<C>, settings: SyncSettings) -> Self {
        Self::hydrate(cache, None, settings).await
    }
}

impl<C: CacheSlot, S: NoteStore> SyncController<C, S> {
    /// Open backed by `store`. Cached notes are shown until the first
    /// snapshot replaces them.
    pub async fn open_with_store(cache: NoteCache<C>, store: S, settings: SyncSettings) -> Self {
        Self::hydrate(cache, Some(store), settings).await
    }

    async fn hydrate(cache: NoteCache<C>, store: Option<S>, settings: SyncSettings) -> Self {
        let notes = cache.load().await;
        let state = if store.is_some() {
            SyncState::Connecting
        } else {
            SyncState::Offline
        };

        let mut controller = Self {
            cache,
            store,
            notes,
            current_note_id: None,
            buffer: EditBuffer::new(settings.debounce),
            state,
            last_error: None,
            settings,
        };
        controller.repair_selection();
        tracing::info!(
            count = controller.notes.len(),
            state = controller.state.label(),
            "Sync controller ready"
        );
        controller
    }

    /// Notes in display order (newest first)
    pub fn notes(&self) -> Vec<Note> {
        display_order(&self.notes)
    }

    /// Notes in the order they were received
    pub fn notes_in_storage_order(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == *id)
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.current_note_id.as_ref().and_then(|id| self.note(id))
    }

    pub const fn current_note_id(&self) -> Option<&NoteId> {
        self.current_note_id.as_ref()
    }

    /// Text currently in the edit buffer
    pub fn temp_text(&self) -> &str {
        self.buffer.text()
    }

    pub const fn sync_state(&self) -> SyncState {
        self.state
    }

    /// Most recent subscription error, cleared by the next snapshot
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// When the pending debounce timer fires
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.buffer.deadline()
    }

    /// Create a note with the default body and select it.
    ///
    /// With a store the ID comes from the store; otherwise one is generated
    /// and the note is prepended locally. On failure nothing changes.
    pub async fn create_note(&mut self) -> Result<NoteId> {
        self.flush_before_switch().await?;

        let fields = NoteFields::new_default();
        let id = match &self.store {
            Some(store) => {
                with_retry(&self.settings.retry, "add", || store.add(fields.clone())).await?
            }
            None => NoteId::generate(),
        };

        let note = Note::from_fields(id.clone(), fields);
        if let Some(existing) = self.notes.iter_mut().find(|existing| existing.id == id) {
            *existing = note;
        } else {
            self.notes.insert(0, note);
        }
        self.set_selection(Some(id.clone()));
        self.persist().await;

        tracing::info!(note_id = %id, "Created note");
        Ok(id)
    }

    /// Merge `body` into an existing note, stamping `updated_at`.
    ///
    /// Unknown IDs are rejected rather than created.
    pub async fn update_note(&mut self, id: &NoteId, body: &str) -> Result<()> {
        if self.note(id).is_none() {
            return Err(Error::NoteNotFound(id.to_string()));
        }

        let patch = NotePatch::body(body);
        if let Some(store) = &self.store {
            with_retry(&self.settings.retry, "set_merge", || {
                store.set_merge(id, patch.clone())
            })
            .await?;
        }

        if let Some(note) = self.notes.iter_mut().find(|note| note.id == *id) {
            note.apply(&patch);
        }
        self.persist().await;

        tracing::debug!(note_id = %id, "Updated note");
        Ok(())
    }

    /// Replace the body of the selected note and resync the buffer with it
    pub async fn update_current_note(&mut self, body: &str) -> Result<()> {
        let Some(id) = self.current_note_id.clone() else {
            return Ok(());
        };
        self.update_note(&id, body).await?;
        let current = self.current_note().cloned();
        self.buffer.load(current.as_ref());
        Ok(())
    }

    /// Delete a note. Selection moves off it immediately.
    pub async fn delete_note(&mut self, id: &NoteId) -> Result<()> {
        if let Some(store) = &self.store {
            with_retry(&self.settings.retry, "delete", || store.delete(id)).await?;
        }

        let before = self.notes.len();
        self.notes.retain(|note| note.id != *id);
        if self.notes.len() == before {
            tracing::debug!(note_id = %id, "Delete for note not held locally");
            return Ok(());
        }

        self.repair_selection();
        self.persist().await;

        tracing::info!(note_id = %id, "Deleted note");
        Ok(())
    }

    /// Replace the note list with an authoritative snapshot.
    ///
    /// The selection survives if its note is still present; otherwise it
    /// moves to the first note in display order. The buffer is only reset
    /// when the selection changes, so in-progress typing is kept.
    pub async fn reconcile_snapshot(&mut self, notes: Vec<Note>) {
        self.notes = dedup_notes(notes);
        self.state = SyncState::Synced;
        self.last_error = None;
        self.repair_selection();
        self.persist().await;

        tracing::debug!(count = self.notes.len(), "Reconciled snapshot");
    }

    /// Select a note. The caller guarantees it is in the list.
    ///
    /// With `flush_on_switch`, a failed flush aborts the switch: the old
    /// note stays selected and its unsent text stays in the buffer.
    pub async fn select_note(&mut self, id: NoteId) -> Result<()> {
        if self.current_note_id.as_ref() == Some(&id) {
            return Ok(());
        }
        self.flush_before_switch().await?;
        self.set_selection(Some(id));
        Ok(())
    }

    /// Record a buffer mutation and restart the debounce timer
    pub fn set_temp_text(&mut self, text: impl Into<String>) {
        self.buffer.edit(text, Instant::now());
    }

    /// Write the buffer if its timer has fired by `now`.
    ///
    /// Returns whether a store write was made.
    pub async fn flush_due(&mut self, now: Instant) -> Result<bool> {
        match self.buffer.take_due(now) {
            Some(flush) => self.write_flush(flush).await,
            None => Ok(false),
        }
    }

    /// Write the buffer now if it differs from the committed body
    pub async fn flush_pending(&mut self) -> Result<bool> {
        match self.buffer.take_current() {
            Some(flush) => self.write_flush(flush).await,
            None => Ok(false),
        }
    }

    /// Enter degraded mode after a snapshot stream failure.
    ///
    /// The last-known-good note list stays in place.
    pub fn mark_stream_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Snapshot stream error, keeping last-known-good notes: {}", message);
        self.state = SyncState::Degraded;
        self.last_error = Some(message);
    }

    async fn write_flush(&mut self, flush: Flush) -> Result<bool> {
        if self.current_note_id.as_ref() != Some(&flush.note_id) {
            tracing::debug!(note_id = %flush.note_id, "Dropping flush for deselected note");
            return Ok(false);
        }
        let Some(committed) = self.note(&flush.note_id) else {
            tracing::debug!(note_id = %flush.note_id, "Dropping flush for removed note");
            return Ok(false);
        };
        if committed.body == flush.text {
            self.buffer.mark_written(flush.generation);
            return Ok(false);
        }

        if let Err(error) = self.update_note(&flush.note_id, &flush.text).await {
            self.buffer.rearm(flush.generation, Instant::now());
            return Err(error);
        }
        self.buffer.mark_written(flush.generation);
        tracing::debug!(
            note_id = %flush.note_id,
            generation = flush.generation,
            "Flushed buffered edit"
        );
        Ok(true)
    }

    async fn flush_before_switch(&mut self) -> Result<()> {
        if !self.settings.flush_on_switch {
            return Ok(());
        }
        if let Err(error) = self.flush_pending().await {
            tracing::warn!("Failed to flush edit before switching notes: {}", error);
            self.last_error = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    /// Ensure the selection names a listed note, or nothing when empty
    fn repair_selection(&mut self) {
        let valid = self
            .current_note_id
            .as_ref()
            .is_some_and(|id| self.notes.iter().any(|note| note.id == *id));
        if valid {
            return;
        }
        let fallback = first_in_display_order(&self.notes).map(|note| note.id.clone());
        self.set_selection(fallback);
    }

    fn set_selection(&mut self, id: Option<NoteId>) {
        if self.current_note_id == id && self.buffer.note_id() == id.as_ref() {
            return;
        }
        self.current_note_id = id;
        let current = self.current_note().cloned();
        self.buffer.load(current.as_ref());
    }

    async fn persist(&self) {
        if let Err(error) = self.cache.save(&self.notes).await {
            tracing::warn!("Failed to persist local cache: {}", error);
        }
    }
}
