//! Metrics aggregation over execution records
//!
//! [`aggregate`] turns a record set into a [`MetricsSummary`]: scalar KPIs,
//! a complexity breakdown, a status breakdown and a time-bucketed series.
//!
//! ## Definitions
//!
//! | Metric | Rule |
//! |--------|------|
//! | Success rate | `successes / total × 100`, 0 when there are no records |
//! | Average | Arithmetic mean over all records, failures included |
//! | Median | Middle value; mean of the two middle values for even counts |
//! | Percentile | Nearest rank: the value at 1-based rank `ceil(p/100 × n)` of the sorted durations |
//! | Buckets | Fixed width from the window start; a record on the window end lands in the last bucket |
//!
//! Aggregation is a pure function of its input, so re-aggregating the same
//! records gives an identical summary.

use crate::config::MetricsConfig;
use crate::types::{ComplexityLabel, ExecutionRecord, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default bucket width in minutes.
pub const DEFAULT_BUCKET_MINUTES: i64 = 60;

/// Default tail percentile.
pub const DEFAULT_PERCENTILE: f64 = 95.0;

/// Upper bound on buckets in one series; wider buckets are used beyond it.
pub const MAX_BUCKETS: i64 = 10_000;

/// Aggregate statistics for one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    // Counts
    pub total_executions: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Percentage of successful runs (0-100)
    pub success_rate: f64,

    // Response time (ms)
    pub avg_response_time_ms: f64,
    pub median_response_time_ms: f64,
    /// Percentile used for `percentile_response_time_ms`
    pub percentile: f64,
    pub percentile_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,

    // Message shape
    pub avg_word_count: f64,
    /// Percentage of messages containing code
    pub code_request_percentage: f64,
    /// Percentage of messages phrased as questions
    pub question_percentage: f64,

    // Distributions
    /// Every label is present, including those with no records
    pub complexity_distribution: BTreeMap<ComplexityLabel, LabelStats>,
    pub status_distribution: StatusDistribution,
    pub time_buckets: Vec<TimeBucket>,
}

impl MetricsSummary {
    /// Zero-valued summary with an empty distribution for every label.
    pub fn empty(percentile: f64) -> Self {
        Self {
            total_executions: 0,
            success_count: 0,
            failure_count: 0,
            success_rate: 0.0,
            avg_response_time_ms: 0.0,
            median_response_time_ms: 0.0,
            percentile,
            percentile_response_time_ms: 0.0,
            min_response_time_ms: 0.0,
            max_response_time_ms: 0.0,
            avg_word_count: 0.0,
            code_request_percentage: 0.0,
            question_percentage: 0.0,
            complexity_distribution: ComplexityLabel::ALL
                .iter()
                .map(|label| (*label, LabelStats::default()))
                .collect(),
            status_distribution: StatusDistribution::default(),
            time_buckets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_executions == 0
    }

    /// Count for a single label.
    pub fn label_count(&self, label: ComplexityLabel) -> usize {
        self.complexity_distribution
            .get(&label)
            .map(|stats| stats.count)
            .unwrap_or(0)
    }
}

/// Per-label breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelStats {
    pub count: usize,
    /// Percentage of all records (0-100)
    pub share: f64,
    /// `None` when the label has no records
    pub avg_execution_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub success: usize,
    pub failure: usize,
}

/// One slot of the time-bucketed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: usize,
    /// `None` for an empty bucket
    pub avg_execution_time_ms: Option<f64>,
}

/// Aggregate with default settings: hourly buckets spanning the records,
/// p95.
pub fn aggregate(records: &[ExecutionRecord]) -> MetricsSummary {
    Aggregator::default().aggregate(records)
}

/// The `n` most recent records, newest first.
pub fn recent(records: &[ExecutionRecord], n: usize) -> Vec<&ExecutionRecord> {
    let mut sorted: Vec<&ExecutionRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(n);
    sorted
}

/// Configurable aggregation.
///
/// Without a window the time series spans the records themselves, starting
/// at the first record's bucket boundary. With a window the series covers
/// the whole window, empty buckets included, and records outside it are
/// left out of the series only.
#[derive(Debug, Clone)]
pub struct Aggregator {
    bucket: Duration,
    percentile: f64,
    window: Option<TimeWindow>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            bucket: Duration::minutes(DEFAULT_BUCKET_MINUTES),
            percentile: DEFAULT_PERCENTILE,
            window: None,
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new()
            .with_bucket_minutes(config.bucket_minutes)
            .with_percentile(config.percentile)
    }

    /// Bucket width; non-positive values keep the current width.
    pub fn with_bucket_minutes(mut self, minutes: i64) -> Self {
        match Duration::try_minutes(minutes) {
            Some(bucket) if minutes > 0 => self.bucket = bucket,
            _ => tracing::debug!(minutes, "Ignoring invalid bucket width"),
        }
        self
    }

    /// Tail percentile in (0, 100]; other values keep the current one.
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        if percentile > 0.0 && percentile <= 100.0 {
            self.percentile = percentile;
        } else {
            tracing::debug!(percentile, "Ignoring invalid percentile");
        }
        self
    }

    /// Bucket the series over `window`.
    pub fn with_window(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn aggregate(&self, records: &[ExecutionRecord]) -> MetricsSummary {
        let mut summary = MetricsSummary::empty(self.percentile);
        summary.time_buckets = self.buckets(records);

        let total = records.len();
        if total == 0 {
            return summary;
        }

        let success_count = records.iter().filter(|r| r.status.is_success()).count();
        let failure_count = total - success_count;

        let mut durations: Vec<f64> = records.iter().map(|r| r.execution_time_ms).collect();
        let avg = mean(&durations);
        durations.sort_by(|a, b| a.total_cmp(b));

        let word_total: usize = records.iter().map(|r| r.features.word_count).sum();
        let with_code = records.iter().filter(|r| r.features.has_code).count();
        let questions = records.iter().filter(|r| r.features.has_question).count();

        summary.total_executions = total;
        summary.success_count = success_count;
        summary.failure_count = failure_count;
        summary.success_rate = percentage(success_count, total);
        summary.avg_response_time_ms = avg;
        summary.median_response_time_ms = median(&durations);
        summary.percentile_response_time_ms = nearest_rank(&durations, self.percentile);
        summary.min_response_time_ms = durations[0];
        summary.max_response_time_ms = durations[total - 1];
        summary.avg_word_count = word_total as f64 / total as f64;
        summary.code_request_percentage = percentage(with_code, total);
        summary.question_percentage = percentage(questions, total);
        summary.status_distribution = StatusDistribution {
            success: success_count,
            failure: failure_count,
        };

        for label in ComplexityLabel::ALL {
            let times: Vec<f64> = records
                .iter()
                .filter(|r| r.complexity_label == label)
                .map(|r| r.execution_time_ms)
                .collect();
            summary.complexity_distribution.insert(
                label,
                LabelStats {
                    count: times.len(),
                    share: percentage(times.len(), total),
                    avg_execution_time_ms: (!times.is_empty()).then(|| mean(&times)),
                },
            );
        }

        summary
    }

    fn buckets(&self, records: &[ExecutionRecord]) -> Vec<TimeBucket> {
        let window = match self.window {
            Some(window) => window,
            None => match span(records, self.bucket) {
                Some(window) => window,
                None => return Vec::new(),
            },
        };

        let bucket_ms = self.bucket_ms_for(&window);
        let window_ms = window.duration().num_milliseconds();
        let count = ((window_ms + bucket_ms - 1) / bucket_ms).max(1);

        let mut sums = vec![(0usize, 0.0f64); count as usize];
        for record in records {
            if !window.contains(record.timestamp) {
                continue;
            }
            let offset = (record.timestamp - window.start).num_milliseconds();
            let index = (offset / bucket_ms).min(count - 1) as usize;
            sums[index].0 += 1;
            sums[index].1 += record.execution_time_ms;
        }

        sums.into_iter()
            .enumerate()
            .map(|(i, (n, total_ms))| {
                let start = window.start + Duration::milliseconds(i as i64 * bucket_ms);
                let end = (start + Duration::milliseconds(bucket_ms)).min(window.end);
                TimeBucket {
                    start,
                    end,
                    count: n,
                    avg_execution_time_ms: (n > 0).then(|| total_ms / n as f64),
                }
            })
            .collect()
    }

    /// Bucket width in ms, widened when the window would need too many.
    fn bucket_ms_for(&self, window: &TimeWindow) -> i64 {
        let bucket_ms = self.bucket.num_milliseconds().max(1);
        let window_ms = window.duration().num_milliseconds();
        if window_ms / bucket_ms < MAX_BUCKETS {
            return bucket_ms;
        }
        let widened = window_ms / MAX_BUCKETS + 1;
        tracing::debug!(bucket_ms, widened, "Widening buckets for long window");
        widened
    }
}

/// Window from the first record's bucket boundary to the last record.
fn span(records: &[ExecutionRecord], bucket: Duration) -> Option<TimeWindow> {
    let first = records.iter().map(|r| r.timestamp).min()?;
    let last = records.iter().map(|r| r.timestamp).max()?;

    let bucket_ms = bucket.num_milliseconds().max(1);
    let first_ms = first.timestamp_millis();
    let aligned = DateTime::<Utc>::from_timestamp_millis(first_ms - first_ms.rem_euclid(bucket_ms))
        .unwrap_or(first);

    // A single instant on a boundary still gets one bucket.
    let end = if last > aligned {
        last
    } else {
        aligned + Duration::milliseconds(bucket_ms)
    };
    TimeWindow::new(aligned, end)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Median of ascending `sorted`.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Nearest-rank percentile of ascending `sorted`.
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = (percentile / 100.0 * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::generator::MockGenerator;
    use crate::types::ExecutionStatus;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).unwrap()
    }

    fn record(ts: DateTime<Utc>, message: &str, ms: f64, status: ExecutionStatus) -> ExecutionRecord {
        let classification = classify(message);
        ExecutionRecord {
            pipeline_id: format!("{}-{}", ts.timestamp(), ms),
            timestamp: ts,
            user_message: message.to_string(),
            complexity_label: classification.label,
            features: classification.features,
            execution_time_ms: ms,
            status,
            final_response: String::new(),
            error_details: None,
        }
    }

    fn scenario() -> Vec<ExecutionRecord> {
        let mut records: Vec<ExecutionRecord> = [100.0, 120.0, 110.0, 130.0, 115.0, 125.0, 105.0, 135.0, 140.0]
            .iter()
            .enumerate()
            .map(|(i, ms)| record(at(9, i as u32 * 5), "Tell me a joke", *ms, ExecutionStatus::Success))
            .collect();
        records.push(record(at(10, 30), "What is the capital of France?", 500.0, ExecutionStatus::Failure));
        records
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let summary = aggregate(&[]);

        assert_eq!(summary.total_executions, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.avg_response_time_ms, 0.0);
        assert_eq!(summary.percentile_response_time_ms, 0.0);
        assert_eq!(summary.complexity_distribution.len(), 4);
        for label in ComplexityLabel::ALL {
            assert_eq!(summary.label_count(label), 0);
            assert_eq!(summary.complexity_distribution[&label].avg_execution_time_ms, None);
        }
        assert!(summary.time_buckets.is_empty());
    }

    #[test]
    fn test_ten_record_scenario() {
        let summary = aggregate(&scenario());

        assert_eq!(summary.total_executions, 10);
        assert_eq!(summary.success_count, 9);
        assert_eq!(summary.failure_count, 1);
        assert!((summary.success_rate - 90.0).abs() < 1e-9);
        assert!((summary.avg_response_time_ms - 158.0).abs() < 1e-9);
        assert_eq!(summary.median_response_time_ms, 122.5);
        assert_eq!(summary.percentile_response_time_ms, 500.0);
        assert_eq!(summary.min_response_time_ms, 100.0);
        assert_eq!(summary.max_response_time_ms, 500.0);
        assert_eq!(summary.status_distribution.success, 9);
        assert_eq!(summary.status_distribution.failure, 1);
        assert!((summary.question_percentage - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_rank_small_samples() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(nearest_rank(&sorted, 25.0), 10.0);
        assert_eq!(nearest_rank(&sorted, 50.0), 20.0);
        assert_eq!(nearest_rank(&sorted, 51.0), 30.0);
        assert_eq!(nearest_rank(&sorted, 100.0), 40.0);
        assert_eq!(nearest_rank(&[7.0], 95.0), 7.0);
        assert_eq!(median(&[1.0, 2.0]), 1.5);
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_buckets_span_records_when_no_window() {
        let summary = aggregate(&scenario());

        assert_eq!(summary.time_buckets.len(), 2);
        assert_eq!(summary.time_buckets[0].start, at(9, 0));
        assert_eq!(summary.time_buckets[0].count, 9);
        assert_eq!(summary.time_buckets[1].count, 1);
        assert_eq!(summary.time_buckets[1].avg_execution_time_ms, Some(500.0));
    }

    #[test]
    fn test_buckets_cover_window_with_empty_slots() {
        let window = TimeWindow::new(at(6, 0), at(12, 0)).unwrap();
        let summary = Aggregator::new()
            .with_window(Some(window))
            .aggregate(&scenario());

        assert_eq!(summary.time_buckets.len(), 6);
        let counts: Vec<usize> = summary.time_buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 9, 1, 0]);
        assert_eq!(summary.time_buckets[0].avg_execution_time_ms, None);
        assert_eq!(summary.time_buckets[5].end, at(12, 0));
    }

    #[test]
    fn test_record_on_window_end_lands_in_last_bucket() {
        let window = TimeWindow::new(at(6, 0), at(8, 0)).unwrap();
        let records = vec![record(at(8, 0), "Hi", 50.0, ExecutionStatus::Success)];
        let summary = Aggregator::new()
            .with_window(Some(window))
            .aggregate(&records);

        assert_eq!(summary.time_buckets.len(), 2);
        assert_eq!(summary.time_buckets[1].count, 1);
    }

    #[test]
    fn test_config_and_invalid_settings() {
        let config = MetricsConfig {
            bucket_minutes: 15,
            percentile: 50.0,
        };
        let window = TimeWindow::new(at(9, 0), at(10, 0)).unwrap();
        let summary = Aggregator::from_config(&config)
            .with_window(Some(window))
            .aggregate(&scenario());
        assert_eq!(summary.time_buckets.len(), 4);
        assert_eq!(summary.percentile, 50.0);

        let aggregator = Aggregator::new().with_bucket_minutes(0).with_percentile(0.0);
        assert_eq!(aggregator.bucket, Duration::minutes(60));
        assert_eq!(aggregator.percentile, 95.0);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = MockGenerator::new(Some(3)).generate(at(0, 0), at(12, 0), 30.0);
        let first = aggregate(&records);
        let second = aggregate(&records);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_label_stats() {
        let records = vec![
            record(at(9, 0), "Hi", 100.0, ExecutionStatus::Success),
            record(at(9, 1), "Hello", 300.0, ExecutionStatus::Success),
        ];
        let summary = aggregate(&records);
        let simple = &summary.complexity_distribution[&ComplexityLabel::Simple];

        assert_eq!(simple.count, 2);
        assert_eq!(simple.share, 100.0);
        assert_eq!(simple.avg_execution_time_ms, Some(200.0));
        assert_eq!(summary.complexity_distribution[&ComplexityLabel::Advanced].share, 0.0);
    }

    #[test]
    fn test_recent_newest_first() {
        let records = scenario();
        let latest = recent(&records, 3);

        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].timestamp, at(10, 30));
        assert!(latest.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(recent(&records, 50).len(), 10);
        assert!(recent(&[], 5).is_empty());
    }

    #[test]
    fn test_summary_serializes_label_keys() {
        let json = serde_json::to_value(aggregate(&scenario())).unwrap();
        assert_eq!(json["complexity_distribution"]["simple"]["count"], 10);
        assert!(json["complexity_distribution"]["advanced"].is_object());
    }

    proptest! {
        #[test]
        fn prop_distribution_sums_to_total(seed in any::<u64>(), hours in 1i64..48) {
            let end = at(12, 0);
            let start = end - Duration::hours(hours);
            let records = MockGenerator::new(Some(seed)).generate(start, end, 20.0);
            let summary = aggregate(&records);

            let label_sum: usize = summary.complexity_distribution.values().map(|s| s.count).sum();
            prop_assert_eq!(label_sum, summary.total_executions);

            let bucket_sum: usize = summary.time_buckets.iter().map(|b| b.count).sum();
            prop_assert_eq!(bucket_sum, summary.total_executions);

            let status = summary.status_distribution;
            prop_assert_eq!(status.success + status.failure, summary.total_executions);
        }

        #[test]
        fn prop_success_rate_matches_counts(seed in any::<u64>()) {
            let records = MockGenerator::new(Some(seed)).generate(at(0, 0), at(12, 0), 10.0);
            let summary = aggregate(&records);
            let successes = records.iter().filter(|r| r.status.is_success()).count();

            if records.is_empty() {
                prop_assert_eq!(summary.success_rate, 0.0);
            } else {
                let expected = 100.0 * successes as f64 / records.len() as f64;
                prop_assert!((summary.success_rate - expected).abs() < 1e-9);
            }
            prop_assert!(summary.min_response_time_ms <= summary.median_response_time_ms);
            prop_assert!(summary.median_response_time_ms <= summary.max_response_time_ms);
            prop_assert!(summary.percentile_response_time_ms <= summary.max_response_time_ms);
        }
    }
}
