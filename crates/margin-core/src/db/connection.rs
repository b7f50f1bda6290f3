//! libSQL connection management

use std::path::Path;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::{Error, Result};

/// Default pull interval for embedded replicas
const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Remote replica settings for the note store database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for the remote database
    pub auth_token: Option<String>,
    /// Background pull interval; `None` means manual sync only
    pub sync_interval: Option<Duration>,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(DEFAULT_SYNC_INTERVAL),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

/// An open libSQL database with its connection, migrated to the current
/// schema.
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    sync_config: Option<SyncConfig>,
}

impl Database {
    /// Open (or create) a local-only database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_local(&path.to_string_lossy()).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_local(":memory:").await
    }

    /// Open an embedded replica of a remote Turso database.
    ///
    /// Reads are served from the local file; writes go to the remote and
    /// come back on the next sync.
    pub async fn open_with_sync(local_path: impl AsRef<Path>, sync_config: SyncConfig) -> Result<Self> {
        let path_str = local_path.as_ref().to_string_lossy().to_string();

        let url = sync_config
            .url
            .clone()
            .ok_or_else(|| Error::InvalidInput("Sync URL is required".into()))?;
        let token = sync_config
            .auth_token
            .clone()
            .ok_or_else(|| Error::InvalidInput("Auth token is required".into()))?;

        let mut builder = Builder::new_remote_replica(&path_str, url, token);
        if let Some(interval) = sync_config.sync_interval {
            builder = builder.sync_interval(interval);
            tracing::debug!("Automatic sync interval set to {:?}", interval);
        }

        let db = builder.build().await?;
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            sync_config: Some(sync_config),
        };

        // Pull first so migrations see the remote schema.
        tracing::debug!("Performing initial sync...");
        database.sync().await?;
        database.prepare().await?;
        Ok(database)
    }

    async fn open_local(target: &str) -> Result<Self> {
        let db = Builder::new_local(target).build().await?;
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            sync_config: None,
        };
        database.prepare().await?;
        Ok(database)
    }

    async fn prepare(&self) -> Result<()> {
        // Some pragmas are rejected by remote replicas
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        migrations::run(&self.conn).await
    }

    /// Pull from the remote database when this is a replica
    pub async fn sync(&self) -> Result<()> {
        if self.sync_config.is_some() {
            self.db.sync().await?;
            tracing::debug!("Database synced with remote");
        }
        Ok(())
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.sync_config.is_some()
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_sync_enabled());
        db.sync().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("margin.db");

        let db = Database::open(&path).await.unwrap();

        assert!(path.exists());
        assert!(!db.is_sync_enabled());
    }

    #[test]
    fn test_sync_config_new() {
        let config = SyncConfig::new("libsql://test.turso.io", "test-token");
        assert!(config.is_configured());
        assert_eq!(config.sync_interval, Some(DEFAULT_SYNC_INTERVAL));
        assert_eq!(config.without_auto_sync().sync_interval, None);
    }

    #[test]
    fn test_sync_config_default_not_configured() {
        assert!(!SyncConfig::default().is_configured());
    }
}
