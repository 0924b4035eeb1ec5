//! Live store reader

use super::{RecordSource, SourceBatch, SourceKind};
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{ExecutionRecord, TimeWindow};
use std::time::{Duration, Instant};

/// [`RecordSource`] backed by a [`RecordStore`].
///
/// Rows are validated into records; malformed rows are dropped and
/// counted. A scan that returns after the timeout is treated as a timeout
/// and its rows are discarded.
pub struct LiveSource<S: RecordStore> {
    store: S,
    timeout: Duration,
}

impl<S: RecordStore> LiveSource<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

impl<S: RecordStore> RecordSource for LiveSource<S> {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn fetch(&self, window: &TimeWindow) -> Result<SourceBatch> {
        let start = Instant::now();
        let rows = self.store.scan_since(window.start)?;
        let elapsed = start.elapsed();

        if elapsed > self.timeout {
            tracing::warn!(
                store = self.store.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = self.timeout.as_millis() as u64,
                "Store scan exceeded timeout; dropping rows"
            );
            return Err(Error::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }

        let scanned = rows.len();
        let mut discarded = 0usize;
        let mut records: Vec<ExecutionRecord> = Vec::with_capacity(scanned);

        for row in rows {
            match row.into_record() {
                Ok(record) if window.contains(record.timestamp) => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    discarded += 1;
                    tracing::debug!(store = self.store.name(), error = %e, "Dropping malformed record");
                }
            }
        }

        records.sort_by_key(|r| r.timestamp);

        if discarded > 0 {
            tracing::warn!(
                store = self.store.name(),
                discarded,
                scanned,
                "Dropped malformed records from store"
            );
        }

        tracing::debug!(
            store = self.store.name(),
            records = records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetched live records"
        );

        Ok(SourceBatch { records, discarded })
    }
}
