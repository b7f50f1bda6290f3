//! Local cache: a process-local mirror of the note list.
//!
//! The whole list lives in one named key-value slot and is rewritten on
//! every change.

mod memory;

pub use memory::MemoryCacheSlot;

use crate::error::{Error, Result};
use crate::models::{dedup_notes, Note};

/// Key under which the note list is persisted
pub const NOTES_CACHE_KEY: &str = "notes";

/// Trait for key-value cache storage (async)
#[allow(async_fn_in_trait)]
pub trait CacheSlot {
    /// Read the raw value stored under `key`
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    async fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Note-list adapter over a [`CacheSlot`].
pub struct NoteCache<C> {
    slot: C,
    key: String,
}

impl<C: CacheSlot> NoteCache<C> {
    /// Cache using the default `notes` key
    pub fn new(slot: C) -> Self {
        Self::with_key(slot, NOTES_CACHE_KEY)
    }

    pub fn with_key(slot: C, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    /// Rehydrate the note list.
    ///
    /// Never fails: an absent, unreadable or corrupt blob yields an empty list.
    pub async fn load(&self) -> Vec<Note> {
        let raw = match self.slot.read(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::warn!(key = %self.key, "Failed to read local cache: {}", error);
                return Vec::new();
            }
        };

        match parse_notes(&raw) {
            Ok(notes) => {
                tracing::debug!(key = %self.key, count = notes.len(), "Loaded notes from local cache");
                notes
            }
            Err(error) => {
                tracing::warn!(key = %self.key, "Discarding local cache: {}", error);
                Vec::new()
            }
        }
    }

    /// Persist the full list, replacing whatever was stored before
    pub async fn save(&self, notes: &[Note]) -> Result<()> {
        let blob = serde_json::to_string(notes)?;
        self.slot.write(&self.key, &blob).await
    }
}

/// Parse a cached blob into a note list with unique IDs.
///
/// A JSON `null` (what a cleared slot may hold) counts as an empty list.
pub fn parse_notes(raw: &str) -> Result<Vec<Note>> {
    let parsed: Option<Vec<Note>> =
        serde_json::from_str(raw).map_err(|error| Error::CacheCorrupt(error.to_string()))?;
    Ok(dedup_notes(parsed.unwrap_or_default()))
}
