//! Key-value storage seam.
//!
//! The engine only needs two primitives from its host: read one value by key,
//! and apply a batch of full-record writes atomically. Every engine operation
//! stages its writes in a [`Transaction`] and commits them in one batch, so a
//! failed operation leaves nothing behind.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{params, Connection, OptionalExtension as _};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{AccommodationId, AuditId, Principal};
use crate::Result;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value BLOB NOT NULL
);
"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    NextAccommodationId,
    NextAuditId,
}

/// Every record namespace the engine persists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKey {
    Accommodation(AccommodationId),
    Standards(AccommodationId),
    Audit(AuditId),
    Certification(AccommodationId),
    Auditor(Principal),
    Counter(Counter),
    AuditChainHead,
}

impl StoreKey {
    pub fn as_storage_key(&self) -> String {
        match self {
            StoreKey::Accommodation(id) => format!("accommodation/{id}"),
            StoreKey::Standards(id) => format!("standards/{id}"),
            StoreKey::Audit(id) => format!("audit/{id}"),
            StoreKey::Certification(id) => format!("certification/{id}"),
            StoreKey::Auditor(principal) => format!("auditor/{principal}"),
            StoreKey::Counter(Counter::NextAccommodationId) => {
                "counter/next-accommodation-id".to_string()
            }
            StoreKey::Counter(Counter::NextAuditId) => "counter/next-audit-id".to_string(),
            StoreKey::AuditChainHead => "audit-chain/head".to_string(),
        }
    }
}

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply every write or none of them.
    fn commit(&self, writes: Vec<(String, Vec<u8>)>) -> Result<()>;
}

/// Non-durable store, mainly for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock_read().is_empty()
    }
}

impl Store for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock_read().get(key).cloned())
    }

    fn commit(&self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut entries = self.lock_write();
        entries.extend(writes);
        Ok(())
    }
}

/// Durable SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock_conn();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn commit(&self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        let conn = self.lock_conn();
        let tx = conn.unchecked_transaction()?;
        for (key, value) in writes {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Staged reads and writes for a single engine operation.
///
/// Reads see this transaction's own staged writes before falling back to the
/// store. Dropping a transaction without calling [`Transaction::commit`]
/// discards everything it staged.
pub struct Transaction<'a> {
    store: &'a dyn Store,
    staged: BTreeMap<String, Vec<u8>>,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn Store) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    pub fn read<T: DeserializeOwned>(&self, key: &StoreKey) -> Result<Option<T>> {
        let key = key.as_storage_key();
        let raw = match self.staged.get(&key) {
            Some(bytes) => Some(bytes.clone()),
            None => self.store.get(&key)?,
        };
        match raw {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn write<T: Serialize>(&mut self, key: &StoreKey, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.staged.insert(key.as_storage_key(), bytes);
        Ok(())
    }

    /// Read a sequence counter; sequences start at 1.
    pub fn counter(&self, counter: Counter) -> Result<u64> {
        Ok(self.read(&StoreKey::Counter(counter))?.unwrap_or(1))
    }

    /// Return the counter's current value and stage its increment.
    pub fn allocate(&mut self, counter: Counter) -> Result<u64> {
        let id = self.counter(counter)?;
        self.write(&StoreKey::Counter(counter), &(id + 1))?;
        Ok(id)
    }

    #[cfg(test)]
    pub(crate) fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        self.store.commit(self.staged.into_iter().collect())
    }
}
