//! Error types for pipescope-core

use thiserror::Error;

/// Main error type for the pipescope-core library
///
/// The engine entry points ([`crate::PipelineLogs::fetch_records`] and
/// [`crate::metrics::aggregate`]) never surface these; store failures are
/// downgraded to a [`crate::FetchStatus`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The live record store is not configured, unreachable or refused access
    #[error("record source unavailable: {0}")]
    SourceUnavailable(String),

    /// The live record store did not answer within the configured bound
    #[error("record source timed out: {elapsed_ms}ms > {timeout_ms}ms")]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    /// A stored record is missing a required field or holds an out-of-range value
    #[error("malformed record {pipeline_id}: {reason}")]
    MalformedRecord { pipeline_id: String, reason: String },
}

/// Result type alias for pipescope-core
pub type Result<T> = std::result::Result<T, Error>;
