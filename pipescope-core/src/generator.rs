//! Mock record generator
//!
//! Produces statistically shaped synthetic execution records for a time
//! window when no live store is available.
//!
//! ## Model
//!
//! - **Arrivals:** homogeneous Poisson process. Inter-arrival gaps are
//!   exponential with mean `1 / rate_per_hour`, so the expected count is
//!   `rate_per_hour × hours` and grows linearly with the window.
//! - **Messages:** drawn from a fixed template pool that spans every
//!   complexity band. The label always comes from [`crate::classify`].
//! - **Durations:** uniform over a band-specific range; higher bands have
//!   both a higher mean and a wider spread.
//! - **Failures:** Bernoulli with a band-specific probability that is
//!   monotonic non-decreasing in complexity (2%, 3%, 4%, 5%).
//!
//! Randomness comes from an injectable [`Rng`]. [`MockGenerator`] wraps a
//! [`StdRng`] seeded from an optional seed: the same seed yields the same
//! sequence, no seed yields a fresh sequence per call.

use crate::classify::classify;
use crate::types::{ComplexityLabel, ExecutionRecord, ExecutionStatus, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Upper bound on records produced by a single call.
pub const MAX_RECORDS: usize = 1_000_000;

/// Relative weight of each band when picking a template, indexed by rank.
const BAND_WEIGHTS: [u32; 4] = [45, 30, 17, 8];

const SIMPLE_MESSAGES: &[&str] = &[
    "Hello, how are you?",
    "What is AI?",
    "Tell me a joke",
    "How does Python work?",
    "What's the weather like?",
    "Can you help me?",
    "Summarize this paragraph for me",
];

const MODERATE_MESSAGES: &[&str] = &[
    "Can you explain machine learning algorithms?",
    "How do I deploy a web application?",
    "What are the best practices for database design?",
    "Help me understand neural networks in simple terms",
    "How do I optimize my code performance?",
    "What's the difference between SQL and NoSQL databases?",
    "How do I implement a REST API in Python?",
];

const COMPLEX_MESSAGES: &[&str] = &[
    "Can you help me debug this SQL query that joins three tables and returns duplicate rows when the index is missing?",
    "Review my Python function() that parses CSV files, caches results and retries failed network calls",
    "How should I structure a Docker deployment for a machine learning model, and which metrics should I monitor for latency?",
    "Explain how database transactions, isolation levels and indexes interact under heavy concurrency",
];

const ADVANCED_MESSAGES: &[&str] = &[
    "I'm building a distributed microservices architecture with Kubernetes and need help with service mesh implementation, load balancing, and monitoring across multiple clusters.",
    "Can you help me debug this complex machine learning pipeline that processes real-time data streams, applies feature engineering, trains models, and serves predictions with sub-millisecond latency?",
    "I need to implement a real-time analytics system that can handle millions of events per second, process them with Apache Kafka and Spark, and store results in both a data lake and data warehouse.",
    "How do I design a fault-tolerant distributed system with proper circuit breakers, retry mechanisms, and graceful degradation across multiple data centers, while keeping database transactions consistent and the query latency low?",
];

const RESPONSES: &[&str] = &[
    "Here is a step-by-step explanation with examples.",
    "I've outlined the main approaches and their trade-offs.",
    "Below is a working snippet and notes on edge cases.",
    "Here is a summary of the key points.",
    "These are the recommended practices, ordered by impact.",
];

const ERROR_DETAILS: &[&str] = &[
    "Timeout exceeded",
    "Service temporarily unavailable",
    "Rate limit exceeded",
    "Invalid input format",
];

/// Template messages the generator draws from for a band.
///
/// Every template classifies into the band it is listed under.
pub fn templates(band: ComplexityLabel) -> &'static [&'static str] {
    match band {
        ComplexityLabel::Simple => SIMPLE_MESSAGES,
        ComplexityLabel::Moderate => MODERATE_MESSAGES,
        ComplexityLabel::Complex => COMPLEX_MESSAGES,
        ComplexityLabel::Advanced => ADVANCED_MESSAGES,
    }
}

/// Inclusive execution time range in milliseconds for a band.
pub fn duration_range_ms(label: ComplexityLabel) -> (u32, u32) {
    match label {
        ComplexityLabel::Simple => (200, 1_200),
        ComplexityLabel::Moderate => (800, 2_500),
        ComplexityLabel::Complex => (2_000, 5_000),
        ComplexityLabel::Advanced => (3_500, 9_000),
    }
}

/// Probability that a run of this band fails.
pub fn failure_probability(label: ComplexityLabel) -> f64 {
    match label {
        ComplexityLabel::Simple => 0.02,
        ComplexityLabel::Moderate => 0.03,
        ComplexityLabel::Complex => 0.04,
        ComplexityLabel::Advanced => 0.05,
    }
}

/// Seeded source of synthetic execution records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator {
    seed: Option<u64>,
}

impl MockGenerator {
    /// Create a generator. `None` draws a fresh OS seed on every call.
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    /// Generate records for `[window_start, window_end]`.
    ///
    /// An inverted window or a non-positive rate yields an empty sequence.
    pub fn generate(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        rate_per_hour: f64,
    ) -> Vec<ExecutionRecord> {
        generate_with(&mut self.rng(), window_start, window_end, rate_per_hour)
    }

    /// Generate exactly `count` records spread uniformly over the window.
    ///
    /// Capped at [`MAX_RECORDS`]; an inverted window yields nothing.
    pub fn generate_count(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        count: usize,
    ) -> Vec<ExecutionRecord> {
        generate_count_with(&mut self.rng(), window_start, window_end, count)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Generate `count` records at uniform times with a caller-supplied random
/// source, sorted by timestamp.
pub fn generate_count_with<R: Rng + ?Sized>(
    rng: &mut R,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    count: usize,
) -> Vec<ExecutionRecord> {
    let Some(window) = TimeWindow::new(window_start, window_end) else {
        return Vec::new();
    };
    let span_us = (window.end - window.start)
        .num_microseconds()
        .unwrap_or(i64::MAX);

    let count = count.min(MAX_RECORDS);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = Duration::microseconds(rng.random_range(0..=span_us));
        let Some(timestamp) = window.start.checked_add_signed(offset) else {
            continue;
        };
        records.push(synthesize_record(rng, timestamp.min(window.end)));
    }

    records.sort_by_key(|r| r.timestamp);
    records
}

/// Generate records with a caller-supplied random source.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    rate_per_hour: f64,
) -> Vec<ExecutionRecord> {
    let Some(window) = TimeWindow::new(window_start, window_end) else {
        tracing::debug!(%window_start, %window_end, "Inverted window, generating nothing");
        return Vec::new();
    };
    if !rate_per_hour.is_finite() || rate_per_hour <= 0.0 {
        tracing::debug!(rate_per_hour, "Non-positive rate, generating nothing");
        return Vec::new();
    }

    let expected = (rate_per_hour * window.hours()).ceil().min(MAX_RECORDS as f64);
    let mut records = Vec::with_capacity(expected as usize);
    let mut cursor = window.start;

    loop {
        // 1 - U lies in (0, 1], keeping ln() finite
        let u: f64 = rng.random();
        let gap_hours = -(1.0 - u).ln() / rate_per_hour;
        let gap = Duration::microseconds((gap_hours * 3_600_000_000.0) as i64);
        match cursor.checked_add_signed(gap) {
            Some(next) if next <= window.end => cursor = next,
            _ => break,
        }
        if records.len() >= MAX_RECORDS {
            tracing::warn!(
                max_records = MAX_RECORDS,
                rate_per_hour,
                "Mock generation hit record cap"
            );
            break;
        }

        records.push(synthesize_record(rng, cursor));
    }

    records.sort_by_key(|r| r.timestamp);

    tracing::debug!(
        count = records.len(),
        hours = window.hours(),
        rate_per_hour,
        "Generated mock records"
    );

    records
}

fn synthesize_record<R: Rng + ?Sized>(rng: &mut R, timestamp: DateTime<Utc>) -> ExecutionRecord {
    let band = pick_band(rng);
    let user_message = choose(rng, templates(band));
    let classification = classify(user_message);
    let label = classification.label;

    let (low, high) = duration_range_ms(label);
    let execution_time_ms = f64::from(rng.random_range(low..=high));

    let (status, final_response, error_details) = if rng.random_bool(failure_probability(label)) {
        (
            ExecutionStatus::Failure,
            String::new(),
            Some(choose(rng, ERROR_DETAILS).to_string()),
        )
    } else {
        (
            ExecutionStatus::Success,
            choose(rng, RESPONSES).to_string(),
            None,
        )
    };

    let mut id_bytes = [0u8; 16];
    rng.fill(&mut id_bytes);

    ExecutionRecord {
        pipeline_id: uuid::Builder::from_random_bytes(id_bytes)
            .into_uuid()
            .to_string(),
        timestamp,
        user_message: user_message.to_string(),
        complexity_label: label,
        features: classification.features,
        execution_time_ms,
        status,
        final_response,
        error_details,
    }
}

fn pick_band<R: Rng + ?Sized>(rng: &mut R) -> ComplexityLabel {
    let total: u32 = BAND_WEIGHTS.iter().sum();
    let mut roll = rng.random_range(0..total);
    for label in ComplexityLabel::ALL {
        let weight = BAND_WEIGHTS[label.rank()];
        if roll < weight {
            return label;
        }
        roll -= weight;
    }
    ComplexityLabel::Simple
}

fn choose<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_templates_classify_into_their_band() {
        for band in ComplexityLabel::ALL {
            for message in templates(band) {
                assert_eq!(classify(message).label, band, "template: {}", message);
            }
        }
    }

    #[test]
    fn test_failure_probability_is_monotonic() {
        let probabilities: Vec<f64> = ComplexityLabel::ALL
            .iter()
            .map(|l| failure_probability(*l))
            .collect();
        assert!(probabilities.windows(2).all(|w| w[0] <= w[1]));
        assert!(probabilities.iter().all(|p| (0.02..=0.05).contains(p)));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let start = window_start();
        let end = start + Duration::hours(6);
        let a = MockGenerator::new(Some(7)).generate(start, end, 50.0);
        let b = MockGenerator::new(Some(7)).generate(start, end, 50.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);

        let c = MockGenerator::new(Some(8)).generate(start, end, 50.0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_parameters_yield_empty() {
        let start = window_start();
        let generator = MockGenerator::new(Some(1));
        assert!(generator.generate(start, start, 100.0).is_empty());
        assert!(generator
            .generate(start, start - Duration::hours(1), 100.0)
            .is_empty());
        assert!(generator
            .generate(start, start + Duration::hours(1), 0.0)
            .is_empty());
        assert!(generator
            .generate(start, start + Duration::hours(1), -5.0)
            .is_empty());
        assert!(generator
            .generate(start, start + Duration::hours(1), f64::NAN)
            .is_empty());
    }

    #[test]
    fn test_day_at_100_per_hour() {
        let start = window_start();
        let end = start + Duration::hours(24);
        let records = MockGenerator::new(Some(42)).generate(start, end, 100.0);

        assert!(
            (1920..=2880).contains(&records.len()),
            "got {} records",
            records.len()
        );

        let mut counts: HashMap<ComplexityLabel, usize> = HashMap::new();
        for r in &records {
            *counts.entry(r.complexity_label).or_default() += 1;
        }
        for label in ComplexityLabel::ALL {
            assert!(counts.get(&label).copied().unwrap_or(0) > 0, "{} missing", label);
        }
    }

    #[test]
    fn test_records_are_well_formed() {
        let start = window_start();
        let end = start + Duration::hours(12);
        let records = MockGenerator::new(Some(3)).generate(start, end, 40.0);

        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        for r in &records {
            assert!(r.timestamp >= start && r.timestamp <= end);
            assert_eq!(classify(&r.user_message).label, r.complexity_label);

            let (low, high) = duration_range_ms(r.complexity_label);
            assert!(r.execution_time_ms >= f64::from(low));
            assert!(r.execution_time_ms <= f64::from(high));

            match r.status {
                ExecutionStatus::Failure => {
                    assert!(r.final_response.is_empty());
                    assert!(r.error_details.is_some());
                }
                ExecutionStatus::Success => {
                    assert!(!r.final_response.is_empty());
                    assert!(r.error_details.is_none());
                }
            }
        }
    }

    #[test]
    fn test_count_scales_with_window() {
        let start = window_start();
        let generator = MockGenerator::new(Some(11));
        let short = generator.generate(start, start + Duration::hours(10), 60.0);
        let long = generator.generate(start, start + Duration::hours(40), 60.0);
        let ratio = long.len() as f64 / short.len() as f64;
        assert!((3.0..=5.0).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn test_pipeline_ids_are_unique() {
        let start = window_start();
        let records = MockGenerator::new(Some(5)).generate(start, start + Duration::hours(5), 80.0);
        let ids: std::collections::HashSet<_> = records.iter().map(|r| &r.pipeline_id).collect();
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn test_generate_count_is_exact_and_in_window() {
        let start = window_start();
        let end = start + Duration::hours(1);
        let generator = MockGenerator::new(Some(13));

        let records = generator.generate_count(start, end, 25);
        assert_eq!(records.len(), 25);
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(records.iter().all(|r| r.timestamp >= start && r.timestamp <= end));
        assert_eq!(records, generator.generate_count(start, end, 25));

        assert!(generator.generate_count(end, start, 5).is_empty());
    }
}
