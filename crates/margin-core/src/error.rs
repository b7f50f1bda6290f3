//! Error types for margin-core

use thiserror::Error;

/// Result type alias using margin-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in margin-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A create/update/delete call against the note store failed
    #[error("Note store unavailable: {0}")]
    StoreUnavailable(String),

    /// The persisted local cache could not be parsed
    #[error("Local cache corrupt: {0}")]
    CacheCorrupt(String),

    /// The snapshot subscription failed or could not be established
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same call may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
