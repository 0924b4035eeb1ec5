//! Store schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! The log table name is configurable, so migrations are templated on
//! `{table}`.

use crate::error::{Error, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: execution log table
    r#"
    CREATE TABLE IF NOT EXISTS {table} (
        pipeline_id        TEXT PRIMARY KEY,
        timestamp          TEXT,
        user_message       TEXT,
        final_response     TEXT,
        execution_time_ms  REAL,
        status             TEXT,
        error_details      TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table}(timestamp);
    "#,
];

/// Whether `name` is usable as an unquoted SQL table name.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 64
}

/// Run all pending migrations for `table`.
pub fn run_migrations(conn: &Connection, table: &str) -> Result<()> {
    if !is_valid_table_name(table) {
        return Err(Error::Config(format!("invalid table name: {:?}", table)));
    }

    // user_version is per database; a table missing from it starts at 0
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?;
    let current_version: i32 = if table_exists {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))?
    } else {
        0
    };

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        table,
        "Checking store migrations"
    );

    for (index, migration) in MIGRATIONS.iter().enumerate() {
        let version = index as i32 + 1;
        if version <= current_version {
            continue;
        }

        tracing::info!(version, table, "Applying store migration");
        conn.execute_batch(&migration.replace("{table}", table))?;
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}
