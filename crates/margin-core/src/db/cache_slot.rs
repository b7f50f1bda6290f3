//! libSQL-backed local cache slot

use libsql::params;

use super::Database;
use crate::cache::CacheSlot;
use crate::error::Result;
use crate::models::now_millis;

/// Key-value cache in the `local_cache` table of a local-only database.
pub struct LibSqlCacheSlot {
    db: Database,
}

impl LibSqlCacheSlot {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl CacheSlot for LibSqlCacheSlot {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT value FROM local_cache WHERE key = ?1", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get::<String>(0)?))
        } else {
            Ok(None)
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO local_cache (key, value, written_at) VALUES (?1, ?2, ?3)",
                params![key, value, now_millis()],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoteCache, NOTES_CACHE_KEY};
    use crate::models::{Note, NoteId};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_read_missing_key() {
        let slot = LibSqlCacheSlot::new(Database::open_in_memory().await.unwrap());
        assert_eq!(slot.read("absent").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_write_overwrites() {
        let slot = LibSqlCacheSlot::new(Database::open_in_memory().await.unwrap());
        slot.write(NOTES_CACHE_KEY, "[]").await.unwrap();
        slot.write(NOTES_CACHE_KEY, "[1]").await.unwrap();
        assert_eq!(
            slot.read(NOTES_CACHE_KEY).await.unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_notes_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cache.db");
        let notes = vec![Note {
            id: NoteId::from("a"),
            body: "# Persisted".to_string(),
            created_at: 5,
            updated_at: 6,
        }];

        {
            let cache = NoteCache::new(LibSqlCacheSlot::new(Database::open(&path).await.unwrap()));
            cache.save(&notes).await.unwrap();
        }

        let cache = NoteCache::new(LibSqlCacheSlot::new(Database::open(&path).await.unwrap()));
        assert_eq!(cache.load().await, notes);
    }
}
