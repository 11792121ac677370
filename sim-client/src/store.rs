use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::StoreError;

/// Durable string key/value storage for one client
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// LMDB-backed store
///
/// One environment directory, one named database. Keys and values are UTF-8.
pub struct LmdbStore {
    env: Environment,
    db: Database,
}

impl LmdbStore {
    const DB_NAME: &'static str = "session_state";
    const MAP_SIZE: usize = 64 * 1024 * 1024;

    /// Open (creating if needed) the environment at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        tracing::info!("Opening LMDB store at: {}", path.display());

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(Self::MAP_SIZE)
            .open(path)?;
        let db = env.create_db(Some(Self::DB_NAME), DatabaseFlags::empty())?;

        Ok(Self { env, db })
    }
}

impl StateStore for LmdbStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.env.begin_ro_txn()?;

        match txn.get(self.db, &key) {
            Ok(bytes) => {
                let value = std::str::from_utf8(bytes)
                    .map_err(|_| StoreError::InvalidUtf8 {
                        key: key.to_string(),
                    })?
                    .to_string();
                Ok(Some(value))
            }
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {}
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn StateStore) {
        assert_eq!(store.load("EF_SAVE_V1").unwrap(), None);

        store.save("EF_SAVE_V1", "{\"tick\":1}").unwrap();
        assert_eq!(store.load("EF_SAVE_V1").unwrap().as_deref(), Some("{\"tick\":1}"));

        store.save("EF_SAVE_V1", "{\"tick\":2}").unwrap();
        assert_eq!(store.load("EF_SAVE_V1").unwrap().as_deref(), Some("{\"tick\":2}"));

        store.remove("EF_SAVE_V1").unwrap();
        assert_eq!(store.load("EF_SAVE_V1").unwrap(), None);
        store.remove("EF_SAVE_V1").unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_lmdb_store() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&LmdbStore::open(dir.path()).unwrap());
    }

    #[test]
    fn test_lmdb_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbStore::open(dir.path()).unwrap();
            store.save("EF_TUTORIAL_DONE", "1").unwrap();
        }
        let store = LmdbStore::open(dir.path()).unwrap();
        assert_eq!(store.load("EF_TUTORIAL_DONE").unwrap().as_deref(), Some("1"));
    }
}
