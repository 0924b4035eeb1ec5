//! Telemetry sinks for computed summaries
//!
//! A [`MetricsSink`] receives each [`MetricsSummary`] along with the
//! [`FetchStatus`] it was computed under. Sinks impose nothing back on the
//! engine: [`publish_all`] logs sink failures and carries on.

use crate::error::Result;
use crate::metrics::MetricsSummary;
use crate::source::FetchStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for computed summaries.
pub trait MetricsSink: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, summary: &MetricsSummary, status: &FetchStatus) -> Result<()>;
}

/// Publishing statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    pub published: usize,
    pub failed: usize,
}

/// Publish to every sink, logging failures instead of returning them.
pub fn publish_all(
    sinks: &[&dyn MetricsSink],
    summary: &MetricsSummary,
    status: &FetchStatus,
) -> PublishStats {
    let mut stats = PublishStats::default();
    for sink in sinks {
        match sink.publish(summary, status) {
            Ok(()) => stats.published += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(sink = sink.name(), error = %e, "Failed to publish metrics");
            }
        }
    }
    stats
}

/// Sink that emits the headline numbers as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn publish(&self, summary: &MetricsSummary, status: &FetchStatus) -> Result<()> {
        tracing::info!(
            source = status.source.as_str(),
            fallback = ?status.fallback,
            discarded = status.discarded,
            total = summary.total_executions,
            success_rate = summary.success_rate,
            avg_ms = summary.avg_response_time_ms,
            percentile = summary.percentile,
            percentile_ms = summary.percentile_response_time_ms,
            "Metrics summary"
        );
        Ok(())
    }
}

/// One line of the JSON-lines export.
#[derive(Debug, Serialize)]
struct SinkEntry<'a> {
    published_at: DateTime<Utc>,
    status: &'a FetchStatus,
    summary: &'a MetricsSummary,
}

/// Sink appending one JSON object per summary to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn publish(&self, summary: &MetricsSummary, status: &FetchStatus) -> Result<()> {
        let entry = SinkEntry {
            published_at: Utc::now(),
            status,
            summary,
        };
        let line = serde_json::to_string(&entry)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("sink writer lock poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;

        tracing::debug!(path = %self.path.display(), "Published metrics summary");
        Ok(())
    }
}
