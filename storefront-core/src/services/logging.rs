//! Logging service - structured event logging to DuckDB
//!
//! Provides a privacy-safe event log stored in logs.duckdb. Only event names,
//! the identity kind ("guest" or "user"), the operation and error messages are
//! recorded. Product ids, prices, user ids and profile fields are never logged.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::SchemaMigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = now_ms().max(0) as u64;

    // Lower 16 bits carry the counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Get current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Detect the current platform
fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            identity: None,
            operation: None,
            error_message: None,
        }
    }

    /// Set the identity kind ("guest" or "user")
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the engine operation or CLI command
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set error information
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub identity: Option<String>,
    pub operation: Option<String>,
    pub error_message: Option<String>,
}

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Opens or creates logs.duckdb in the data directory and runs any
    /// pending migrations.
    pub fn new(data_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn, Some(db_path), app_version.into())
    }

    /// Event log that lives only as long as the process
    pub fn open_in_memory(app_version: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, None, app_version.into())
    }

    fn with_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        app_version: String,
    ) -> Result<Self> {
        SchemaMigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            app_version,
            platform: detect_platform(),
        })
    }

    /// Log an event
    ///
    /// The app version and platform are added from the service configuration.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, app_version, platform,
                event, identity, operation, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.identity,
                &event.operation,
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log an error
    pub fn log_error(&self, event: &str, message: &str) -> Result<()> {
        self.log(LogEvent::new(event).with_error(message))
    }

    /// Most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(
            "SELECT id, timestamp, app_version, platform, event, identity, operation, error_message
             FROM sys_logs
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
            limit,
        )
    }

    /// Most recent entries carrying an error, newest first
    pub fn errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(
            "SELECT id, timestamp, app_version, platform, event, identity, operation, error_message
             FROM sys_logs
             WHERE error_message IS NOT NULL
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
            limit,
        )
    }

    fn query(&self, sql: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(sql)?;

        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    app_version: row.get(2)?,
                    platform: row.get(3)?,
                    event: row.get(4)?,
                    identity: row.get(5)?,
                    operation: row.get(6)?,
                    error_message: row.get(7)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Get the total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Path to the logs database, `None` for an in-memory log
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_service_creation() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), "1.0.0").unwrap();

        assert!(service.db_path().unwrap().exists());
    }

    #[test]
    fn test_log_event() {
        let service = LoggingService::open_in_memory("1.0.0").unwrap();

        service.log_event("cart_loaded").unwrap();

        let entries = service.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "cart_loaded");
        assert_eq!(entries[0].app_version, "1.0.0");
        assert!(entries[0].identity.is_none());
    }

    #[test]
    fn test_log_with_context() {
        let service = LoggingService::open_in_memory("2.0.0").unwrap();

        service
            .log(
                LogEvent::new("cart_item_added")
                    .with_identity("guest")
                    .with_operation("add_to_cart"),
            )
            .unwrap();

        let entries = service.recent(10).unwrap();
        assert_eq!(entries[0].identity.as_deref(), Some("guest"));
        assert_eq!(entries[0].operation.as_deref(), Some("add_to_cart"));
    }

    #[test]
    fn test_errors_only_returns_failures() {
        let service = LoggingService::open_in_memory("1.0.0").unwrap();

        service.log_event("cart_loaded").unwrap();
        service
            .log_error("migration_partial_failure", "1 cart line failed")
            .unwrap();

        let errors = service.errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "migration_partial_failure");
        assert_eq!(errors[0].error_message.as_deref(), Some("1 cart line failed"));
    }

    #[test]
    fn test_count_and_delete() {
        let service = LoggingService::open_in_memory("1.0.0").unwrap();

        service.log_event("event1").unwrap();
        service.log_event("event2").unwrap();
        service.log_event("event3").unwrap();

        assert_eq!(service.count().unwrap(), 3);

        // Delete all logs (using future timestamp)
        let deleted = service.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_log_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let service = LoggingService::new(dir.path(), "1.0.0").unwrap();
            service.log_event("logout").unwrap();
        }

        let service = LoggingService::new(dir.path(), "1.0.1").unwrap();
        assert_eq!(service.count().unwrap(), 1);
    }
}
