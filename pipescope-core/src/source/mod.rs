//! Record source adapter
//!
//! Callers ask [`PipelineLogs`] for the last N hours of execution records
//! and get the same shape back whether the records came from the live
//! store or the mock generator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      PipelineLogs                        │
//! │                                                          │
//! │   primary (chosen at construction)      fallback         │
//! │   ┌─────────────────────────────┐   ┌────────────────┐   │
//! │   │ Demo | Live(RecordSource) | │   │   MockSource   │   │
//! │   │ Unavailable(reason)         │   │ (MockGenerator)│   │
//! │   └──────────────┬──────────────┘   └───────┬────────┘   │
//! │                  │  error / timeout / empty │            │
//! │                  └──────────────►───────────┘            │
//! │                                                          │
//! │   FetchOutcome { records, status: FetchStatus }          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Live-store failures never reach the caller as errors. They are logged
//! and reported through [`FetchStatus::fallback`].

mod adapter;
mod live;
mod mock;

pub use adapter::PipelineLogs;
pub use live::LiveSource;
pub use mock::MockSource;

use crate::error::Result;
use crate::types::{ExecutionRecord, TimeWindow};
use serde::Serialize;

/// A capability that yields execution records for a window.
pub trait RecordSource: Send + Sync {
    /// Which kind of data this source serves.
    fn kind(&self) -> SourceKind;

    /// Records whose timestamps lie in `window`, sorted ascending.
    fn fetch(&self, window: &TimeWindow) -> Result<SourceBatch>;
}

/// Records returned by a [`RecordSource`].
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub records: Vec<ExecutionRecord>,
    /// Rows dropped as malformed
    pub discarded: usize,
}

/// Where a record set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Mock,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Mock => "mock",
        }
    }
}

/// Why mock data was served in place of live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No store exists at the configured location
    NotConfigured { detail: String },
    /// The store could not be opened or queried
    Unavailable { detail: String },
    /// The store did not answer within the configured bound
    Timeout { elapsed_ms: u64, timeout_ms: u64 },
    /// The store answered with no records for the window
    EmptyStore,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NotConfigured { detail } => write!(f, "store not configured ({})", detail),
            FallbackReason::Unavailable { detail } => write!(f, "store unavailable ({})", detail),
            FallbackReason::Timeout {
                elapsed_ms,
                timeout_ms,
            } => write!(f, "store timed out ({}ms > {}ms)", elapsed_ms, timeout_ms),
            FallbackReason::EmptyStore => f.write_str("store returned no records"),
        }
    }
}

/// Side-channel status accompanying every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchStatus {
    /// Source that produced the returned records
    pub source: SourceKind,
    /// Set when live data was wanted but mock data was served
    pub fallback: Option<FallbackReason>,
    /// Live rows dropped as malformed
    pub discarded: usize,
    /// The window that was served; `None` for invalid parameters
    pub window: Option<TimeWindow>,
    /// Demo mode was configured; mock data is expected, not a fallback
    pub demo_mode: bool,
}

impl FetchStatus {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Records plus the status describing how they were obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<ExecutionRecord>,
    pub status: FetchStatus,
}
