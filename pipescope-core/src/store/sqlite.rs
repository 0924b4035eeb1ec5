//! SQLite-backed record store
//!
//! Reads are bounded by the configured timeout twice over: a busy timeout
//! for lock contention and a progress handler that interrupts a query once
//! its deadline passes. Either way the scan surfaces as [`Error::Timeout`].

use super::{format_timestamp, parse_timestamp, schema, RecordStore, StoredRecord};
use crate::error::{Error, Result};
use crate::types::ExecutionRecord;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 100;

/// Lexical slack applied to the SQL lower bound.
///
/// Rows written with an offset or without a zone do not sort lexically
/// against the canonical format, so the SQL filter is widened and the exact
/// cut happens after parsing.
const LOWER_BOUND_SLACK_HOURS: i64 = 24;

/// Execution log store in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
    label: String,
    timeout: Duration,
}

impl SqliteStore {
    /// Open an existing store for reading.
    ///
    /// A missing file or table is reported as [`Error::SourceUnavailable`];
    /// this never creates anything on disk.
    pub fn open(path: &Path, table: &str, timeout: Duration) -> Result<Self> {
        if !schema::is_valid_table_name(table) {
            return Err(Error::Config(format!("invalid table name: {:?}", table)));
        }
        if !path.exists() {
            return Err(Error::SourceUnavailable(format!(
                "no store at {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(timeout)?;

        let store = Self::from_connection(conn, table, path.display().to_string(), timeout);
        if !store.table_exists()? {
            return Err(Error::SourceUnavailable(format!(
                "table {} missing in {}",
                table,
                path.display()
            )));
        }
        Ok(store)
    }

    /// Open or create a store, running migrations.
    pub fn create(path: &Path, table: &str, timeout: Duration) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        conn.busy_timeout(timeout)?;
        schema::run_migrations(&conn, table)?;

        Ok(Self::from_connection(
            conn,
            table,
            path.display().to_string(),
            timeout,
        ))
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(table: &str, timeout: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn, table)?;
        Ok(Self::from_connection(
            conn,
            table,
            ":memory:".to_string(),
            timeout,
        ))
    }

    fn from_connection(conn: Connection, table: &str, location: String, timeout: Duration) -> Self {
        Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            label: format!("sqlite:{}#{}", location, table),
            timeout,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::SourceUnavailable("store connection lock poisoned".to_string()))
    }

    fn table_exists(&self) -> Result<bool> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [&self.table],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ============================================
    // Writes
    // ============================================

    /// Insert or replace records. Returns the number written.
    pub fn insert_records(&self, records: &[ExecutionRecord]) -> Result<usize> {
        let rows: Vec<StoredRecord> = records.iter().map(StoredRecord::from_record).collect();
        self.insert_rows(&rows)
    }

    /// Insert or replace raw rows, including ones that would not validate.
    pub fn insert_rows(&self, rows: &[StoredRecord]) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                r#"
                INSERT OR REPLACE INTO {} (
                    pipeline_id, timestamp, user_message, final_response,
                    execution_time_ms, status, error_details
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                self.table
            ))?;

            for row in rows {
                stmt.execute(params![
                    row.pipeline_id,
                    row.timestamp,
                    row.user_message,
                    row.final_response,
                    row.execution_time_ms,
                    row.status,
                    row.error_details,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(rows = rows.len(), store = %self.label, "Inserted rows");
        Ok(rows.len())
    }

    /// Total rows in the log table.
    pub fn count(&self) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    // ============================================
    // Reads
    // ============================================

    fn query_since(
        conn: &Connection,
        table: &str,
        since: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<StoredRecord>> {
        let lower_bound = format_timestamp(
            since
                .checked_sub_signed(ChronoDuration::hours(LOWER_BOUND_SLACK_HOURS))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        );
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT pipeline_id, timestamp, user_message, final_response,
                   execution_time_ms, status, error_details
            FROM {}
            WHERE timestamp IS NULL OR timestamp >= ?1
            "#,
            table
        ))?;

        let rows = stmt
            .query_map([lower_bound], Self::row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_stored(row: &Row) -> rusqlite::Result<StoredRecord> {
        Ok(StoredRecord {
            pipeline_id: text_column(row, 0)?,
            timestamp: text_column(row, 1)?,
            user_message: text_column(row, 2)?,
            final_response: text_column(row, 3)?,
            execution_time_ms: number_column(row, 4)?,
            status: text_column(row, 5)?,
            error_details: text_column(row, 6)?,
        })
    }

    fn map_scan_error(&self, err: rusqlite::Error, started: Instant) -> Error {
        match &err {
            // Interrupted by the deadline, or still locked after the busy timeout
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy
                ) =>
            {
                Error::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            }
            _ => Error::Database(err),
        }
    }
}

impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        &self.label
    }

    fn scan_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredRecord>> {
        let conn = self.connection()?;
        let started = Instant::now();
        let deadline = started + self.timeout;

        conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        let result = Self::query_since(&conn, &self.table, since);
        conn.progress_handler(0, None::<fn() -> bool>);

        let rows = result.map_err(|e| self.map_scan_error(e, started))?;

        // Exact cut; rows without a parseable timestamp stay for accounting
        let rows: Vec<StoredRecord> = rows
            .into_iter()
            .filter(|row| {
                row.timestamp
                    .as_deref()
                    .and_then(parse_timestamp)
                    .map_or(true, |ts| ts >= since)
            })
            .collect();

        tracing::debug!(
            store = %self.label,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scanned store"
        );
        Ok(rows)
    }
}

fn text_column(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

fn number_column(row: &Row, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}
