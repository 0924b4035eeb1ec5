//! Mock record source

use super::{RecordSource, SourceBatch, SourceKind};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::generator::MockGenerator;
use crate::types::TimeWindow;

/// Fewest records a configured mock source serves for a non-empty window.
pub const MIN_RECORDS_PER_WINDOW: usize = 1;

/// [`RecordSource`] serving synthetic records at a fixed rate.
///
/// A Poisson draw can come up empty for a short window or a low rate. When
/// it yields fewer than `min_records`, exactly `min_records` records are
/// spread over the window instead.
#[derive(Debug, Clone, Copy)]
pub struct MockSource {
    generator: MockGenerator,
    rate_per_hour: f64,
    min_records: usize,
}

impl MockSource {
    pub fn new(generator: MockGenerator, rate_per_hour: f64) -> Self {
        Self {
            generator,
            rate_per_hour,
            min_records: 0,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(MockGenerator::new(config.seed), config.rate_per_hour)
            .with_min_records(MIN_RECORDS_PER_WINDOW)
    }

    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records;
        self
    }
}

impl RecordSource for MockSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mock
    }

    fn fetch(&self, window: &TimeWindow) -> Result<SourceBatch> {
        let mut records = self
            .generator
            .generate(window.start, window.end, self.rate_per_hour);

        if records.len() < self.min_records {
            tracing::debug!(
                generated = records.len(),
                min_records = self.min_records,
                hours = window.hours(),
                "Mock draw below minimum; spreading minimum count over window"
            );
            records = self
                .generator
                .generate_count(window.start, window.end, self.min_records);
        }

        Ok(SourceBatch {
            records,
            discarded: 0,
        })
    }
}
