//! Key-value store contract and SQLite implementation.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Logical document keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Array of `Medicine`.
    Medicines,
    /// Map of date to `DayRecord`.
    History,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::Medicines, StoreKey::History];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medicines => "@totka_medicines",
            Self::History => "@totka_history",
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage failure for document reads and writes.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "storage failure: {err}"),
            Self::Serialize(err) => write!(f, "document encoding failure: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Durable string-keyed document storage.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when the key was never written.
    fn read(&self, key: StoreKey) -> StoreResult<Option<String>>;
    /// Replaces the entire value for `key`.
    fn write(&self, key: StoreKey, value: &str) -> StoreResult<()>;
    /// Removes `key`; removing a missing key is a no-op.
    fn remove(&self, key: StoreKey) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn read(&self, key: StoreKey) -> StoreResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: StoreKey, value: &str) -> StoreResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: StoreKey) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed store over the `kv_store` table.
#[derive(Clone, Copy)]
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn read(&self, key: StoreKey) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: StoreKey, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key.as_str(), value],
        )?;
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1;", [key.as_str()])?;
        Ok(())
    }
}
