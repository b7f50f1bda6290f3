//! Note store: the authoritative document collection once sync is live.
//!
//! Every change to the collection is delivered to subscribers as a full
//! snapshot, never a diff.

mod memory;
mod subscription;

pub use memory::{MemoryNoteStore, StoreCall};
pub use subscription::{SnapshotEvent, SnapshotHub, Subscription};

use crate::error::{Error, Result};
use crate::models::{NoteFields, NoteId, NotePatch};

/// Trait for note store operations (async)
#[allow(async_fn_in_trait)]
pub trait NoteStore {
    /// Create a document; the store assigns its ID
    async fn add(&self, fields: NoteFields) -> Result<NoteId>;

    /// Merge write: only the `Some` fields of `patch` change
    async fn set_merge(&self, id: &NoteId, patch: NotePatch) -> Result<()>;

    /// Remove a document
    async fn delete(&self, id: &NoteId) -> Result<()>;

    /// Open a snapshot stream; the first event is the current snapshot
    async fn subscribe(&self) -> Result<Subscription>;
}

/// Placeholder store for controllers running without remote sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

impl NoteStore for NoStore {
    async fn add(&self, _fields: NoteFields) -> Result<NoteId> {
        Err(not_connected())
    }

    async fn set_merge(&self, _id: &NoteId, _patch: NotePatch) -> Result<()> {
        Err(not_connected())
    }

    async fn delete(&self, _id: &NoteId) -> Result<()> {
        Err(not_connected())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        Err(Error::Subscription("no note store configured".to_string()))
    }
}

fn not_connected() -> Error {
    Error::StoreUnavailable("no note store configured".to_string())
}
