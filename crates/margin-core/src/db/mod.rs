//! Database layer for Margin

mod cache_slot;
mod connection;
mod migrations;
mod note_store;

pub use cache_slot::LibSqlCacheSlot;
pub use connection::{Database, SyncConfig};
pub use note_store::LibSqlNoteStore;
