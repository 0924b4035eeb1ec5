//! Integration tests for the fetch → aggregate flow
//!
//! These tests seed an on-disk SQLite store in a temp directory and drive
//! it through `PipelineLogs` the way the CLI does.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipescope_core::alerts::{self, Alert, AlertThresholds};
use pipescope_core::metrics::{self, Aggregator};
use pipescope_core::store::format_timestamp;
use pipescope_core::{
    ComplexityLabel, Config, FallbackReason, MockGenerator, PipelineLogs, SourceKind, SqliteStore,
    StoredRecord,
};
use std::path::Path;
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn config_for(db_path: &Path) -> Config {
    let mut config = Config::default();
    config.source.database_path = Some(db_path.to_path_buf());
    config.generator.seed = Some(99);
    config.generator.rate_per_hour = 20.0;
    config
}

/// Create a store at `path` holding mock records for the 24h before `now()`.
fn seed_store(path: &Path, rate: f64) -> usize {
    let store = SqliteStore::create(path, "pipeline_logs", std::time::Duration::from_secs(5))
        .unwrap();
    let records = MockGenerator::new(Some(5)).generate(now() - Duration::hours(24), now(), rate);
    store.insert_records(&records).unwrap()
}

#[test]
fn test_live_store_round_trip() {
    pipescope_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("logs.db");
    let inserted = seed_store(&db, 10.0);
    assert!(inserted > 0);

    let logs = PipelineLogs::new(&config_for(&db));
    assert_eq!(logs.primary_kind(), SourceKind::Live);

    let outcome = logs.fetch_records_at(24, now());
    assert_eq!(outcome.status.source, SourceKind::Live);
    assert!(!outcome.status.is_fallback());
    assert_eq!(outcome.records.len(), inserted);
    assert!(outcome
        .records
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));

    // A shorter window only sees its slice of the store.
    let recent = logs.fetch_records_at(6, now());
    let cutoff = now() - Duration::hours(6);
    assert!(recent.records.len() < inserted);
    assert!(recent.records.iter().all(|r| r.timestamp >= cutoff));
}

#[test]
fn test_malformed_rows_are_discarded_and_counted() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("logs.db");
    let store = SqliteStore::create(&db, "pipeline_logs", std::time::Duration::from_secs(5))
        .unwrap();

    let good = StoredRecord {
        pipeline_id: Some("good".to_string()),
        timestamp: Some(format_timestamp(now() - Duration::hours(1))),
        user_message: Some("What is the capital of France?".to_string()),
        final_response: Some("Paris".to_string()),
        execution_time_ms: Some(320.0),
        status: Some("SUCCESS".to_string()),
        error_details: None,
    };
    let negative = StoredRecord {
        pipeline_id: Some("negative".to_string()),
        execution_time_ms: Some(-5.0),
        ..good.clone()
    };
    let no_status = StoredRecord {
        pipeline_id: Some("no-status".to_string()),
        status: None,
        ..good.clone()
    };
    let bad_timestamp = StoredRecord {
        pipeline_id: Some("bad-ts".to_string()),
        timestamp: Some("yesterday".to_string()),
        ..good.clone()
    };
    store
        .insert_rows(&[good, negative, no_status, bad_timestamp])
        .unwrap();
    drop(store);

    let logs = PipelineLogs::new(&config_for(&db));
    let outcome = logs.fetch_records_at(24, now());

    assert_eq!(outcome.status.source, SourceKind::Live);
    assert_eq!(outcome.status.discarded, 3);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].pipeline_id, "good");
    assert_eq!(outcome.records[0].complexity_label, ComplexityLabel::Simple);
}

#[test]
fn test_missing_store_falls_back_to_mock() {
    let dir = TempDir::new().unwrap();
    let logs = PipelineLogs::new(&config_for(&dir.path().join("absent.db")));

    let outcome = logs.fetch_records_at(24, now());
    assert_eq!(outcome.status.source, SourceKind::Mock);
    assert!(matches!(
        outcome.status.fallback,
        Some(FallbackReason::NotConfigured { .. })
    ));
    assert!(!outcome.records.is_empty());

    let window = outcome.status.window.unwrap();
    assert!(outcome.records.iter().all(|r| window.contains(r.timestamp)));
}

#[test]
fn test_short_window_fallback_is_never_empty() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir.path().join("absent.db"));
    config.generator.rate_per_hour = 4.0;

    for seed in 0..200 {
        config.generator.seed = Some(seed);
        let outcome = PipelineLogs::new(&config).fetch_records_at(1, now());
        assert!(outcome.status.is_fallback());
        assert!(!outcome.records.is_empty(), "seed {} fell back to nothing", seed);
    }
}

#[test]
fn test_store_without_table_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("other.db");
    seed_store(&db, 5.0);

    let mut config = config_for(&db);
    config.source.table = "missing_table".to_string();
    let outcome = PipelineLogs::new(&config).fetch_records_at(24, now());

    assert!(matches!(
        outcome.status.fallback,
        Some(FallbackReason::Unavailable { .. })
    ));
    assert!(!outcome.records.is_empty());
}

#[test]
fn test_window_back_to_earliest_time_reads_live_store() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("logs.db");
    let inserted = seed_store(&db, 10.0);

    let hours = (now() - DateTime::<Utc>::MIN_UTC).num_hours();
    let outcome = PipelineLogs::new(&config_for(&db)).fetch_records_at(hours, now());

    assert_eq!(outcome.status.source, SourceKind::Live);
    assert!(!outcome.status.is_fallback());
    assert_eq!(outcome.records.len(), inserted);
}

#[test]
fn test_locked_store_falls_back_with_timeout() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("locked.db");
    let locker = rusqlite::Connection::open(&db).unwrap();
    locker
        .execute_batch(
            "CREATE TABLE pipeline_logs (
                pipeline_id TEXT PRIMARY KEY, timestamp TEXT, user_message TEXT,
                final_response TEXT, execution_time_ms REAL, status TEXT,
                error_details TEXT
            );",
        )
        .unwrap();

    let mut config = config_for(&db);
    config.source.timeout_ms = 200;
    let logs = PipelineLogs::new(&config);
    assert_eq!(logs.primary_kind(), SourceKind::Live);

    locker.execute_batch("BEGIN EXCLUSIVE;").unwrap();
    let outcome = logs.fetch_records_at(24, now());
    locker.execute_batch("COMMIT;").unwrap();

    assert_eq!(outcome.status.source, SourceKind::Mock);
    assert!(matches!(
        outcome.status.fallback,
        Some(FallbackReason::Timeout {
            timeout_ms: 200,
            ..
        })
    ));
    assert!(!outcome.records.is_empty());
}

#[test]
fn test_empty_store_falls_back_when_enabled() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("empty.db");
    SqliteStore::create(&db, "pipeline_logs", std::time::Duration::from_secs(5)).unwrap();

    let outcome = PipelineLogs::new(&config_for(&db)).fetch_records_at(24, now());
    assert_eq!(outcome.status.fallback, Some(FallbackReason::EmptyStore));
    assert!(!outcome.records.is_empty());

    let mut config = config_for(&db);
    config.source.fallback_on_empty = false;
    let outcome = PipelineLogs::new(&config).fetch_records_at(24, now());
    assert_eq!(outcome.status.source, SourceKind::Live);
    assert!(outcome.records.is_empty());
}

#[test]
fn test_fetch_then_aggregate() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("logs.db");
    let inserted = seed_store(&db, 50.0);

    let config = config_for(&db);
    let outcome = PipelineLogs::new(&config).fetch_records_at(24, now());
    let summary = Aggregator::from_config(&config.metrics)
        .with_window(outcome.status.window)
        .aggregate(&outcome.records);

    assert_eq!(summary.total_executions, inserted);
    assert_eq!(summary.time_buckets.len(), 24);
    let bucket_total: usize = summary.time_buckets.iter().map(|b| b.count).sum();
    assert_eq!(bucket_total, inserted);
    let label_total: usize = summary
        .complexity_distribution
        .values()
        .map(|s| s.count)
        .sum();
    assert_eq!(label_total, inserted);
    assert!(summary.success_rate > 80.0);

    // Live records re-derive labels, so the store agrees with the generator.
    let generated =
        MockGenerator::new(Some(5)).generate(now() - Duration::hours(24), now(), 50.0);
    assert_eq!(
        metrics::aggregate(&generated).complexity_distribution,
        metrics::aggregate(&outcome.records).complexity_distribution
    );

    let alerts = alerts::evaluate(&summary, &AlertThresholds::from(&config.alerts));
    assert!(!alerts.contains(&Alert::NoExecutions));
}

#[test]
fn test_non_positive_hours_never_touch_the_store() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("logs.db");
    seed_store(&db, 5.0);

    let logs = PipelineLogs::new(&config_for(&db));
    for hours in [0, -3] {
        let outcome = logs.fetch_records_at(hours, now());
        assert!(outcome.records.is_empty());
        assert!(outcome.status.window.is_none());
        assert_eq!(metrics::aggregate(&outcome.records).total_executions, 0);
    }
}
