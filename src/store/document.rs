//! SQLite-backed document collection backend.
//!
//! Each item is stored as one serialized JSON document in the `doc`
//! column and looked up via the `id` column. The SQLite rowid is never
//! exposed; the item id is the only key callers ever see, so this
//! backend stays behaviorally interchangeable with the in-memory one.

use super::{apply_patch, materialize, Item, ItemDraft, ItemPatch, ItemStore, StoreError, StoreResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS items (
    id  TEXT NOT NULL UNIQUE,
    doc TEXT NOT NULL
);";

/// Durable document-collection backend over a single SQLite connection.
///
/// All operations take the connection lock, which gives the same
/// single-writer discipline the in-memory backend has.
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open (or create) the collection at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::bootstrap(conn)
    }

    /// In-memory collection, used by tests.
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(backend)?;
        conn.execute_batch(SCHEMA_SQL).map_err(backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn fetch(conn: &Connection, id: &str) -> StoreResult<Option<Item>> {
        let doc: Option<String> = conn
            .query_row("SELECT doc FROM items WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(backend)?;

        match doc {
            Some(doc) => Ok(Some(parse_doc(&doc)?)),
            None => Ok(None),
        }
    }
}

impl ItemStore for DocumentStore {
    fn create(&self, draft: ItemDraft) -> StoreResult<Item> {
        let item = materialize(draft)?;
        let doc = encode_doc(&item)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO items (id, doc) VALUES (?1, ?2);",
            params![item.id, doc],
        )
        .map_err(backend)?;
        Ok(item)
    }

    fn list(&self) -> StoreResult<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT doc FROM items;").map_err(backend)?;
        let mut rows = stmt.query([]).map_err(backend)?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().map_err(backend)? {
            let doc: String = row.get(0).map_err(backend)?;
            items.push(parse_doc(&doc)?);
        }
        Ok(items)
    }

    fn get(&self, id: &str) -> StoreResult<Item> {
        let conn = self.conn.lock();
        Self::fetch(&conn, id)?.ok_or(StoreError::NotFound)
    }

    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<Item> {
        let conn = self.conn.lock();
        let mut item = Self::fetch(&conn, id)?.ok_or(StoreError::NotFound)?;
        apply_patch(&mut item, patch)?;

        let doc = encode_doc(&item)?;
        let changed = conn
            .execute(
                "UPDATE items SET doc = ?1 WHERE id = ?2;",
                params![doc, id],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(item)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM items WHERE id = ?1;", [id])
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn encode_doc(item: &Item) -> StoreResult<String> {
    serde_json::to_string(item).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_doc(doc: &str) -> StoreResult<Item> {
    serde_json::from_str(doc)
        .map_err(|e| StoreError::Backend(format!("invalid persisted item document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> ItemDraft {
        ItemDraft {
            name: Some(name.to_string()),
            ..ItemDraft::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = DocumentStore::open_in_memory().expect("open");
        let created = store.create(draft("Drill")).expect("create");
        let fetched = store.get(&created.id).expect("get");
        assert_eq!(created, fetched);
    }

    #[test]
    fn test_create_empty_name_adds_nothing() {
        let store = DocumentStore::open_in_memory().expect("open");
        assert!(matches!(
            store.create(ItemDraft::default()),
            Err(StoreError::EmptyName)
        ));
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn test_update_is_partial() {
        let store = DocumentStore::open_in_memory().expect("open");
        let created = store
            .create(ItemDraft {
                name: Some("Drill".to_string()),
                description: Some("Corded".to_string()),
                photo_url: Some("/photos/d.png".to_string()),
            })
            .expect("create");

        let updated = store
            .update(
                &created.id,
                ItemPatch {
                    name: Some("Impact driver".to_string()),
                    ..ItemPatch::default()
                },
            )
            .expect("update");

        assert_eq!(updated.name, "Impact driver");
        assert_eq!(updated.description, "Corded");
        assert_eq!(updated.photo_url.as_deref(), Some("/photos/d.png"));

        // Lookup is by the item id field, not any backend key
        let fetched = store.get(&created.id).expect("get");
        assert_eq!(fetched, updated);
    }

    #[test]
    fn test_delete_then_get_then_delete_again() {
        let store = DocumentStore::open_in_memory().expect("open");
        let created = store.create(draft("Drill")).expect("create");

        store.delete(&created.id).expect("first delete");
        assert!(matches!(store.get(&created.id), Err(StoreError::NotFound)));
        assert!(matches!(
            store.delete(&created.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_items_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inventory.db");

        let created = {
            let store = DocumentStore::open(&path).expect("open");
            store.create(draft("Drill")).expect("create")
        };

        let store = DocumentStore::open(&path).expect("reopen");
        let fetched = store.get(&created.id).expect("get after reopen");
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_list_returns_all() {
        let store = DocumentStore::open_in_memory().expect("open");
        store.create(draft("Hammer")).expect("create");
        store.create(draft("Saw")).expect("create");
        assert_eq!(store.list().expect("list").len(), 2);
    }
}
