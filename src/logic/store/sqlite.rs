//! SQLite-Backed Store
//!
//! Embedded persistence for sessions that must survive a restart. Items are
//! stored as JSON rows; `put_all` replaces the collection in one transaction.

use std::marker::PhantomData;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ObjectStore, StoreError};

pub struct SqliteStore<T> {
    conn: Mutex<Connection>,
    capacity: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqliteStore<T> {
    pub fn open(path: &Path, capacity: usize) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS items (idx INTEGER PRIMARY KEY, body TEXT NOT NULL)",
            [],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            capacity,
            _marker: PhantomData,
        })
    }
}

impl<T: Serialize + DeserializeOwned + Send + Sync> ObjectStore<T> for SqliteStore<T> {
    fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT body FROM items ORDER BY idx")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            let body = row.map_err(|e| StoreError::Backend(e.to_string()))?;
            items.push(
                serde_json::from_str(&body).map_err(|e| StoreError::Backend(e.to_string()))?,
            );
        }
        Ok(items)
    }

    fn put_all(&self, items: &[T]) -> Result<(), StoreError> {
        if items.len() > self.capacity {
            return Err(StoreError::CapacityExceeded {
                attempted: items.len(),
                capacity: self.capacity,
            });
        }

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tx.execute("DELETE FROM items", [])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        for (idx, item) in items.iter().enumerate() {
            let body =
                serde_json::to_string(item).map_err(|e| StoreError::Backend(e.to_string()))?;
            tx.execute(
                "INSERT INTO items (idx, body) VALUES (?1, ?2)",
                rusqlite::params![idx as i64, body],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM items", [])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        value: i64,
    }

    #[test]
    fn test_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let items = vec![
            Item {
                id: "a".into(),
                value: 1,
            },
            Item {
                id: "b".into(),
                value: 2,
            },
        ];
        {
            let store: SqliteStore<Item> = SqliteStore::open(&path, 100).unwrap();
            store.put_all(&items).unwrap();
        }
        let store: SqliteStore<Item> = SqliteStore::open(&path, 100).unwrap();
        assert_eq!(store.get_all().unwrap(), items);

        store.clear().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_capacity_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let store: SqliteStore<Item> =
            SqliteStore::open(&dir.path().join("s.db"), 1).unwrap();
        let items = vec![
            Item {
                id: "a".into(),
                value: 1,
            },
            Item {
                id: "b".into(),
                value: 2,
            },
        ];
        assert!(matches!(
            store.put_all(&items),
            Err(StoreError::CapacityExceeded { .. })
        ));
    }
}
