//! DuckDB key-value store implementation
//!
//! Device storage lives in a single `kv_store` table: one JSON document per
//! key plus a version used for compare-and-swap writes. Removing a key nulls
//! its value and bumps the version instead of deleting the row.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::migrations::MIGRATIONS;
use crate::ports::{KeyValueStore, Versioned};
use crate::services::SchemaMigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

/// DuckDB-backed device storage
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) the store at `db_path` and bring its schema up to date
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        log::warn!(
                            "Device store busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open device store after {} retries", MAX_RETRIES)))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading is not needed and trips code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Ensure the kv_store schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        SchemaMigrationService::new(&conn, MIGRATIONS).run_pending()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Number of keys currently stored
    pub fn key_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM kv_store WHERE value IS NOT NULL",
            [],
            |row| row.get(0),
        )?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn read(&self, key: &str) -> Result<Option<Versioned>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, version FROM kv_store WHERE key = ? AND value IS NOT NULL",
                [key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(value, version)| Versioned {
            value,
            version: version.max(0) as u64,
        }))
    }

    /// Compare-and-swap write; `Ok(None)` means the expected version was stale
    fn write(&self, key: &str, value: &str, expected_version: Option<u64>) -> Result<Option<u64>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // (last version, whether the key currently holds a value)
        let (last, present) = tx
            .query_row(
                "SELECT version, value IS NOT NULL FROM kv_store WHERE key = ?",
                [key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?
            .map(|(v, present)| (v.max(0) as u64, present))
            .unwrap_or((0, false));
        let live = if present { last } else { 0 };

        if let Some(expected) = expected_version {
            if expected != live {
                tx.rollback()?;
                return Ok(None);
            }
        }

        let version = last + 1;
        tx.execute(
            "INSERT INTO kv_store (key, value, version, updated_at)
             VALUES (?, ?, ?, current_timestamp)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![key, value, version as i64],
        )?;
        tx.commit()?;

        Ok(Some(version))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE kv_store
             SET value = NULL, version = version + 1, updated_at = current_timestamp
             WHERE key = ? AND value IS NOT NULL",
            [key],
        )?;
        Ok(())
    }
}

impl KeyValueStore for DuckDbStore {
    fn get(&self, key: &str) -> DomainResult<Option<Versioned>> {
        self.read(key)
            .map_err(|e| DomainError::storage(format!("Failed to read '{}': {}", key, e)))
    }

    fn set(&self, key: &str, value: &str, expected_version: Option<u64>) -> DomainResult<u64> {
        match self.write(key, value, expected_version) {
            Ok(Some(version)) => Ok(version),
            Ok(None) => Err(DomainError::Conflict(key.to_string())),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to write '{}': {}",
                key, e
            ))),
        }
    }

    fn remove(&self, key: &str) -> DomainResult<()> {
        self.delete(key)
            .map_err(|e| DomainError::storage(format!("Failed to remove '{}': {}", key, e)))
    }
}
