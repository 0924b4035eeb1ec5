//! The `fetch_records` entry point

use super::{
    FallbackReason, FetchOutcome, FetchStatus, LiveSource, MockSource, RecordSource, SourceKind,
};
use crate::config::Config;
use crate::error::Error;
use crate::store::SqliteStore;
use crate::types::TimeWindow;
use chrono::{DateTime, Utc};

/// Primary source selected at construction.
enum Primary {
    /// Demo mode: serve mock data, no fallback is reported
    Demo,
    /// A live source to try first
    Live(Box<dyn RecordSource>),
    /// The live store could not be set up; every fetch falls back
    Unavailable(FallbackReason),
}

/// Record source adapter.
///
/// Stateless apart from its construction-time choices, so a single
/// instance can serve concurrent callers.
pub struct PipelineLogs {
    primary: Primary,
    fallback: MockSource,
    fallback_on_empty: bool,
}

impl PipelineLogs {
    /// Build from configuration.
    ///
    /// Opens the SQLite store unless demo mode is set. A store that cannot
    /// be opened is remembered as the fallback reason for every fetch.
    pub fn new(config: &Config) -> Self {
        let fallback = MockSource::from_config(&config.generator);
        let source = &config.source;

        let primary = if source.demo_mode {
            tracing::info!("Demo mode enabled; serving mock records");
            Primary::Demo
        } else {
            let path = source.resolved_database_path();
            match SqliteStore::open(&path, &source.table, source.timeout()) {
                Ok(store) => {
                    tracing::info!(path = %path.display(), table = %source.table, "Using live store");
                    Primary::Live(Box::new(LiveSource::new(store, source.timeout())))
                }
                Err(e) => {
                    let reason = match e {
                        Error::SourceUnavailable(detail) if !path.exists() => {
                            FallbackReason::NotConfigured { detail }
                        }
                        other => FallbackReason::Unavailable {
                            detail: other.to_string(),
                        },
                    };
                    tracing::warn!(
                        path = %path.display(),
                        %reason,
                        "Live store unavailable; serving mock records"
                    );
                    Primary::Unavailable(reason)
                }
            }
        };

        Self {
            primary,
            fallback,
            fallback_on_empty: source.fallback_on_empty,
        }
    }

    /// Adapter over an explicit primary source.
    pub fn with_source(
        primary: Box<dyn RecordSource>,
        fallback: MockSource,
        fallback_on_empty: bool,
    ) -> Self {
        Self {
            primary: Primary::Live(primary),
            fallback,
            fallback_on_empty,
        }
    }

    /// Adapter that only ever serves mock data.
    pub fn demo(fallback: MockSource) -> Self {
        Self {
            primary: Primary::Demo,
            fallback,
            fallback_on_empty: false,
        }
    }

    /// Kind of source tried first.
    pub fn primary_kind(&self) -> SourceKind {
        match &self.primary {
            Primary::Live(source) => source.kind(),
            Primary::Demo | Primary::Unavailable(_) => SourceKind::Mock,
        }
    }

    /// Records for the last `hours` hours up to now.
    pub fn fetch_records(&self, hours: i64) -> FetchOutcome {
        self.fetch_records_at(hours, Utc::now())
    }

    /// Records for the `hours` hours leading up to `now`.
    ///
    /// Never fails: non-positive `hours` yields an empty outcome and any
    /// live-store problem degrades to mock data with the reason recorded in
    /// the returned status.
    pub fn fetch_records_at(&self, hours: i64, now: DateTime<Utc>) -> FetchOutcome {
        let demo_mode = matches!(self.primary, Primary::Demo);

        let Some(window) = TimeWindow::last_hours(now, hours) else {
            tracing::debug!(hours, "Non-positive hours; returning no records");
            return FetchOutcome {
                records: Vec::new(),
                status: FetchStatus {
                    source: self.primary_kind(),
                    fallback: None,
                    discarded: 0,
                    window: None,
                    demo_mode,
                },
            };
        };

        let (reason, discarded) = match &self.primary {
            Primary::Demo => (None, 0),
            Primary::Unavailable(reason) => (Some(reason.clone()), 0),
            Primary::Live(source) => match source.fetch(&window) {
                Ok(batch) if batch.records.is_empty() && self.fallback_on_empty => {
                    tracing::info!(hours, "Live store empty for window; serving mock records");
                    (Some(FallbackReason::EmptyStore), batch.discarded)
                }
                Ok(batch) => {
                    return FetchOutcome {
                        records: batch.records,
                        status: FetchStatus {
                            source: source.kind(),
                            fallback: None,
                            discarded: batch.discarded,
                            window: Some(window),
                            demo_mode,
                        },
                    };
                }
                Err(e) => {
                    let reason = match e {
                        Error::Timeout {
                            elapsed_ms,
                            timeout_ms,
                        } => FallbackReason::Timeout {
                            elapsed_ms,
                            timeout_ms,
                        },
                        other => FallbackReason::Unavailable {
                            detail: other.to_string(),
                        },
                    };
                    tracing::warn!(hours, %reason, "Live fetch failed; serving mock records");
                    (Some(reason), 0)
                }
            },
        };

        let records = match self.fallback.fetch(&window) {
            Ok(batch) => batch.records,
            Err(e) => {
                tracing::error!(error = %e, "Mock generation failed");
                Vec::new()
            }
        };

        FetchOutcome {
            records,
            status: FetchStatus {
                source: SourceKind::Mock,
                fallback: reason,
                discarded,
                window: Some(window),
                demo_mode,
            },
        }
    }
}
