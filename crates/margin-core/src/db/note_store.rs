//! libSQL-backed note store

use std::sync::Arc;

use libsql::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Note, NoteFields, NoteId, NotePatch};
use crate::store::{NoteStore, SnapshotHub, Subscription};

/// Note store over a libSQL database.
///
/// With an embedded replica the remote Turso database is authoritative:
/// writes go to the remote, and [`LibSqlNoteStore::sync`] pulls changes made
/// by other clients and publishes them as a snapshot.
pub struct LibSqlNoteStore {
    db: Database,
    hub: Arc<SnapshotHub>,
}

impl LibSqlNoteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            hub: SnapshotHub::new(),
        }
    }

    /// All documents in insertion order
    pub async fn list(&self) -> Result<Vec<Note>> {
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT id, body, created_at, updated_at FROM notes ORDER BY rowid",
                (),
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Note {
                id: NoteId::from(row.get::<String>(0)?),
                body: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            });
        }
        Ok(notes)
    }

    /// Pull remote changes (replicas only) and publish a fresh snapshot
    pub async fn sync(&self) -> Result<()> {
        if let Err(error) = self.db.sync().await {
            self.hub.publish_error(error.to_string());
            return Err(error);
        }
        self.publish().await;
        Ok(())
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.db.is_sync_enabled()
    }

    async fn publish(&self) {
        if self.hub.subscriber_count() == 0 {
            return;
        }
        match self.list().await {
            Ok(notes) => self.hub.publish(&notes),
            Err(error) => {
                tracing::warn!("Failed to read notes for snapshot: {}", error);
                self.hub.publish_error(error.to_string());
            }
        }
    }
}

impl NoteStore for LibSqlNoteStore {
    async fn add(&self, fields: NoteFields) -> Result<NoteId> {
        let id = NoteId::generate();
        self.db
            .connection()
            .execute(
                "INSERT INTO notes (id, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), fields.body.as_str(), fields.created_at, fields.updated_at],
            )
            .await
            .map_err(unavailable)?;

        self.publish().await;
        Ok(id)
    }

    async fn set_merge(&self, id: &NoteId, patch: NotePatch) -> Result<()> {
        let conn = self.db.connection();
        let result = match (patch.body, patch.updated_at) {
            (Some(body), Some(updated_at)) => {
                conn.execute(
                    "UPDATE notes SET body = ?1, updated_at = ?2 WHERE id = ?3",
                    params![body.as_str(), updated_at, id.as_str()],
                )
                .await
            }
            (Some(body), None) => {
                conn.execute(
                    "UPDATE notes SET body = ?1 WHERE id = ?2",
                    params![body.as_str(), id.as_str()],
                )
                .await
            }
            (None, Some(updated_at)) => {
                conn.execute(
                    "UPDATE notes SET updated_at = ?1 WHERE id = ?2",
                    params![updated_at, id.as_str()],
                )
                .await
            }
            (None, None) => return Ok(()),
        };

        if result.map_err(unavailable)? == 0 {
            tracing::debug!(note_id = %id, "Ignoring merge write for missing document");
            return Ok(());
        }

        self.publish().await;
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM notes WHERE id = ?1", params![id.as_str()])
            .await
            .map_err(unavailable)?;

        self.publish().await;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let notes = self
            .list()
            .await
            .map_err(|error| Error::Subscription(error.to_string()))?;
        Ok(self.hub.subscribe(notes))
    }
}

fn unavailable(error: libsql::Error) -> Error {
    Error::StoreUnavailable(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotEvent;
    use pretty_assertions::assert_eq;

    async fn setup() -> LibSqlNoteStore {
        LibSqlNoteStore::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_and_list() {
        let store = setup().await;
        let first = store.add(NoteFields::with_body("one")).await.unwrap();
        let second = store.add(NoteFields::with_body("two")).await.unwrap();

        let notes = store.list().await.unwrap();
        let ids: Vec<NoteId> = notes.iter().map(|note| note.id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_merge_preserves_created_at() {
        let store = setup().await;
        let fields = NoteFields {
            body: "draft".to_string(),
            created_at: 10,
            updated_at: 10,
        };
        let id = store.add(fields).await.unwrap();

        store
            .set_merge(
                &id,
                NotePatch {
                    body: Some("final".to_string()),
                    updated_at: Some(99),
                },
            )
            .await
            .unwrap();

        let notes = store.list().await.unwrap();
        assert_eq!(
            notes,
            vec![Note {
                id,
                body: "final".to_string(),
                created_at: 10,
                updated_at: 99,
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_merge_missing_document_is_ignored() {
        let store = setup().await;
        store
            .set_merge(&NoteId::from("nope"), NotePatch::body("late"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let store = setup().await;
        let id = store.add(NoteFields::new_default()).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_subscribers_receive_full_snapshots() {
        let store = setup().await;
        let mut sub = store.subscribe().await.unwrap();
        assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(Vec::new())));

        let id = store.add(NoteFields::with_body("hello")).await.unwrap();
        store.set_merge(&id, NotePatch::body("hello!")).await.unwrap();

        let Some(SnapshotEvent::Snapshot(after_add)) = sub.next().await else {
            panic!("expected snapshot after add");
        };
        assert_eq!(after_add.len(), 1);
        let Some(SnapshotEvent::Snapshot(after_merge)) = sub.next().await else {
            panic!("expected snapshot after merge");
        };
        assert_eq!(after_merge[0].body, "hello!");

        store.sync().await.unwrap();
        assert!(matches!(sub.next().await, Some(SnapshotEvent::Snapshot(_))));
    }
}
