//! # pipescope-core
//!
//! Core library for pipescope - execution analytics for an AI pipeline.
//!
//! This library provides:
//! - Domain types for execution records and time windows
//! - A rule-based query complexity classifier
//! - A seeded mock record generator for demo mode
//! - A record source adapter over a live SQLite store with mock fallback
//! - Metrics aggregation, alerts and telemetry sinks
//! - Configuration management and logging infrastructure
//!
//! ## Data flow
//!
//! ```text
//! PipelineLogs::fetch_records(hours)
//!     ├── LiveSource  (SqliteStore, bounded by the configured timeout)
//!     └── MockSource  (MockGenerator, used in demo mode or on fallback)
//!             │
//!             ▼
//!     FetchOutcome { records, status }
//!             │
//!             ▼
//! metrics::aggregate(&records) -> MetricsSummary
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pipescope_core::{metrics, Config, PipelineLogs};
//!
//! let config = Config::load().expect("failed to load config");
//! let logs = PipelineLogs::new(&config);
//!
//! let outcome = logs.fetch_records(24);
//! let summary = metrics::aggregate(&outcome.records);
//! println!("{} executions, {:.1}% success", summary.total_executions, summary.success_rate);
//! ```

// Re-export commonly used items at the crate root
pub use classify::{classify, Classification};
pub use config::Config;
pub use error::{Error, Result};
pub use generator::MockGenerator;
pub use metrics::{aggregate, MetricsSummary};
pub use source::{
    FallbackReason, FetchOutcome, FetchStatus, PipelineLogs, RecordSource, SourceKind,
};
pub use store::{RecordStore, SqliteStore, StoredRecord};
pub use types::*;

// Public modules
pub mod alerts;
pub mod classify;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod sink;
pub mod source;
pub mod store;
pub mod types;
