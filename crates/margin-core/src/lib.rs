//! margin-core - Core library for Margin
//!
//! This crate contains the note models, the sync controller with its edit
//! buffer and local cache, and the libSQL-backed note store used by the
//! Margin CLI.

pub mod buffer;
pub mod cache;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod models;
pub mod retry;
pub mod session;
pub mod state;
pub mod store;
pub mod util;

pub use config::ClientConfig;
pub use controller::{SyncController, SyncSettings};
pub use error::{Error, Result};
pub use models::{Note, NoteId};
pub use session::{Session, Tick, Wake};
pub use state::SyncState;
