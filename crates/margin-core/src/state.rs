//! Shared sync state types.

/// Connection state surfaced to the view layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No note store configured; the local cache is the only persistence
    Offline,
    /// Store configured, waiting for the first snapshot
    Connecting,
    /// Last snapshot reconciled successfully
    Synced,
    /// The snapshot stream failed; showing last-known-good notes
    Degraded,
}

impl SyncState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Connecting => "connecting",
            Self::Synced => "synced",
            Self::Degraded => "degraded",
        }
    }
}
