//! Live record store
//!
//! The key-attribute store holding real execution logs. The engine reads it
//! through [`RecordStore`]; [`SqliteStore`] is the bundled implementation.
//!
//! Rows come back as [`StoredRecord`]s with every field optional, so a
//! damaged row never fails the whole scan. [`StoredRecord::into_record`]
//! validates a row into an [`ExecutionRecord`].

mod schema;
mod sqlite;

pub use schema::{is_valid_table_name, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::types::{ExecutionRecord, ExecutionStatus};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Read access to a store of execution logs.
pub trait RecordStore: Send + Sync {
    /// Human-readable store name for logs.
    fn name(&self) -> &str;

    /// Return rows whose timestamp is at or after `since`.
    ///
    /// Rows with a missing timestamp are included so callers can account
    /// for them. Order is unspecified.
    fn scan_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredRecord>>;
}

/// A raw row from the live store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredRecord {
    pub pipeline_id: Option<String>,
    pub timestamp: Option<String>,
    pub user_message: Option<String>,
    pub final_response: Option<String>,
    pub execution_time_ms: Option<f64>,
    pub status: Option<String>,
    pub error_details: Option<String>,
}

impl StoredRecord {
    /// Row representation of a record.
    pub fn from_record(record: &ExecutionRecord) -> Self {
        Self {
            pipeline_id: Some(record.pipeline_id.clone()),
            timestamp: Some(format_timestamp(record.timestamp)),
            user_message: Some(record.user_message.clone()),
            final_response: Some(record.final_response.clone()),
            execution_time_ms: Some(record.execution_time_ms),
            status: Some(record.status.as_str().to_string()),
            error_details: record.error_details.clone(),
        }
    }

    /// Validate this row into an [`ExecutionRecord`].
    ///
    /// The complexity label is always re-derived from the message.
    pub fn into_record(self) -> Result<ExecutionRecord> {
        let pipeline_id = match self.pipeline_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(malformed("<unknown>", "missing pipeline_id")),
        };

        let Some(raw_ts) = self.timestamp else {
            return Err(malformed(&pipeline_id, "missing timestamp"));
        };
        let Some(timestamp) = parse_timestamp(&raw_ts) else {
            return Err(malformed(
                &pipeline_id,
                &format!("unparseable timestamp {:?}", raw_ts),
            ));
        };

        let Some(user_message) = self.user_message else {
            return Err(malformed(&pipeline_id, "missing user_message"));
        };

        let execution_time_ms = match self.execution_time_ms {
            Some(ms) if ms.is_finite() && ms >= 0.0 => ms,
            Some(ms) => {
                return Err(malformed(
                    &pipeline_id,
                    &format!("execution_time_ms out of range: {}", ms),
                ))
            }
            None => return Err(malformed(&pipeline_id, "missing execution_time_ms")),
        };

        let Some(raw_status) = self.status else {
            return Err(malformed(&pipeline_id, "missing status"));
        };
        let Some(status) = ExecutionStatus::from_storage(&raw_status) else {
            return Err(malformed(
                &pipeline_id,
                &format!("unknown status {:?}", raw_status),
            ));
        };

        let classification = classify(&user_message);

        Ok(ExecutionRecord {
            pipeline_id,
            timestamp,
            user_message,
            complexity_label: classification.label,
            features: classification.features,
            execution_time_ms,
            status,
            final_response: self.final_response.unwrap_or_default(),
            error_details: self.error_details,
        })
    }
}

fn malformed(pipeline_id: &str, reason: &str) -> Error {
    Error::MalformedRecord {
        pipeline_id: pipeline_id.to_string(),
        reason: reason.to_string(),
    }
}

/// Storage format for timestamps: RFC 3339, UTC, microsecond precision.
///
/// Fixed width, so lexical order matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 with any offset, or a naive ISO 8601 datetime which is
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
