// store.rs - storage backends for the replay log
// Copyright (C) 2018  David Stainton.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{is_live, Fingerprint, ReplayRecord};
use crate::error::StorageError;

/// The key value store underlying the decayed log. Implementations must
/// apply every batch atomically: either all of its records land or none.
pub trait ReplayStore: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<u32>, StorageError>;

    /// Upsert the records unconditionally.
    fn put_batch(&self, records: &[ReplayRecord]) -> Result<(), StorageError>;

    /// Insert the records whose fingerprint is absent or expired at
    /// `height`, and flag the others as replays without touching them.
    fn record_batch(&self, records: &[ReplayRecord], height: u32) -> Result<Vec<bool>, StorageError>;

    /// returns true if a record was removed
    fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, StorageError>;

    /// Remove every record whose expiry is below `height`, returning how
    /// many were removed.
    fn delete_expired(&self, height: u32) -> Result<usize, StorageError>;

    /// Release the underlying storage. Later calls fail with
    /// `StorageError::Closed`.
    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// MemoryStore keeps the log in a HashMap. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Fingerprint, u32>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplayStore for MemoryStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<u32>, StorageError> {
        Ok(self.records.lock().get(fingerprint).copied())
    }

    fn put_batch(&self, records: &[ReplayRecord]) -> Result<(), StorageError> {
        let mut map = self.records.lock();
        for record in records {
            map.insert(record.fingerprint, record.expiry);
        }
        Ok(())
    }

    fn record_batch(&self, records: &[ReplayRecord], height: u32) -> Result<Vec<bool>, StorageError> {
        let mut map = self.records.lock();
        let mut seen = HashSet::with_capacity(records.len());
        let mut replays = Vec::with_capacity(records.len());
        for record in records {
            let replay = !seen.insert(record.fingerprint)
                || matches!(map.get(&record.fingerprint), Some(&expiry) if is_live(expiry, height));
            if !replay {
                map.insert(record.fingerprint, record.expiry);
            }
            replays.push(replay);
        }
        Ok(replays)
    }

    fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, StorageError> {
        Ok(self.records.lock().remove(fingerprint).is_some())
    }

    fn delete_expired(&self, height: u32) -> Result<usize, StorageError> {
        let mut map = self.records.lock();
        let before = map.len();
        map.retain(|_, expiry| is_live(*expiry, height));
        Ok(before - map.len())
    }
}

const CREATE_SHARED_HASH_BUCKET: &str = "
    CREATE TABLE IF NOT EXISTS shared_hash (
        fingerprint BLOB PRIMARY KEY NOT NULL,
        expiry      INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS shared_hash_expiry ON shared_hash (expiry);";

const SELECT_EXPIRY: &str = "SELECT expiry FROM shared_hash WHERE fingerprint = ?1";

const UPSERT_RECORD: &str = "INSERT INTO shared_hash (fingerprint, expiry) VALUES (?1, ?2)
    ON CONFLICT (fingerprint) DO UPDATE SET expiry = excluded.expiry";

const DELETE_RECORD: &str = "DELETE FROM shared_hash WHERE fingerprint = ?1";

const DELETE_EXPIRED: &str = "DELETE FROM shared_hash WHERE expiry < ?1";

/// SqliteStore persists the log in a single SQLite table. One connection
/// behind a mutex makes it a single writer, and every batch is one
/// transaction.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating missing parent
    /// directories.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<SqliteStore, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let journal_mode = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        debug!(journal_mode = %journal_mode, "opened replay log database at '{}'", path.display());
        SqliteStore::init(conn)
    }

    /// Open a throwaway database; used for testing.
    pub fn open_in_memory() -> Result<SqliteStore, StorageError> {
        SqliteStore::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<SqliteStore, StorageError> {
        conn.execute_batch(CREATE_SHARED_HASH_BUCKET)?;
        Ok(SqliteStore {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        f(conn)
    }
}

impl ReplayStore for SqliteStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<u32>, StorageError> {
        self.with_conn(|conn| {
            let expiry = conn
                .query_row(SELECT_EXPIRY, params![&fingerprint[..]], |row| row.get::<_, u32>(0))
                .optional()?;
            Ok(expiry)
        })
    }

    fn put_batch(&self, records: &[ReplayRecord]) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut upsert = tx.prepare_cached(UPSERT_RECORD)?;
                for record in records {
                    upsert.execute(params![&record.fingerprint[..], record.expiry])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn record_batch(&self, records: &[ReplayRecord], height: u32) -> Result<Vec<bool>, StorageError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut seen = HashSet::with_capacity(records.len());
            let mut replays = Vec::with_capacity(records.len());
            {
                let mut select = tx.prepare_cached(SELECT_EXPIRY)?;
                let mut upsert = tx.prepare_cached(UPSERT_RECORD)?;
                for record in records {
                    let mut replay = !seen.insert(record.fingerprint);
                    if !replay {
                        let existing = select
                            .query_row(params![&record.fingerprint[..]], |row| row.get::<_, u32>(0))
                            .optional()?;
                        replay = matches!(existing, Some(expiry) if is_live(expiry, height));
                    }
                    if !replay {
                        upsert.execute(params![&record.fingerprint[..], record.expiry])?;
                    }
                    replays.push(replay);
                }
            }
            tx.commit()?;
            Ok(replays)
        })
    }

    fn delete(&self, fingerprint: &Fingerprint) -> Result<bool, StorageError> {
        self.with_conn(|conn| Ok(conn.execute(DELETE_RECORD, params![&fingerprint[..]])? > 0))
    }

    fn delete_expired(&self, height: u32) -> Result<usize, StorageError> {
        self.with_conn(|conn| Ok(conn.execute(DELETE_EXPIRED, params![height])?))
    }

    fn close(&self) -> Result<(), StorageError> {
        if let Some(conn) = self.conn.lock().take() {
            conn.close().map_err(|(_, err)| StorageError::Sqlite(err))?;
        }
        Ok(())
    }
}
