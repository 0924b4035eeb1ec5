//! Text and JSON rendering for CLI output

use pipescope_core::alerts::{Alert, Severity};
use pipescope_core::{ExecutionRecord, FetchStatus, MetricsSummary, SourceKind};
use serde::Serialize;

/// Width of the message column in the recent-executions table
const MESSAGE_WIDTH: usize = 48;

/// Everything `pipescope summary` reports
#[derive(Serialize)]
pub struct SummaryReport<'a> {
    pub hours: i64,
    pub status: &'a FetchStatus,
    pub summary: &'a MetricsSummary,
    pub alerts: &'a [Alert],
}

impl SummaryReport<'_> {
    pub fn print_text(&self) {
        let summary = self.summary;

        println!("Pipeline analytics (last {}h)", self.hours);
        print_status(self.status);
        println!();

        if summary.is_empty() {
            println!("No executions found.");
            if self.status.window.is_none() {
                println!("Use --hours with a positive number of hours.");
            }
            print_alerts(self.alerts);
            return;
        }

        println!("Executions:      {}", summary.total_executions);
        println!(
            "Success rate:    {:.1}% ({} failed)",
            summary.success_rate, summary.failure_count
        );
        println!("Avg response:    {}", format_ms(summary.avg_response_time_ms));
        println!("Median:          {}", format_ms(summary.median_response_time_ms));
        println!(
            "p{:<16}{}",
            format_percentile(summary.percentile),
            format_ms(summary.percentile_response_time_ms)
        );
        println!(
            "Range:           {} to {}",
            format_ms(summary.min_response_time_ms),
            format_ms(summary.max_response_time_ms)
        );
        println!("Avg words:       {:.1}", summary.avg_word_count);
        println!("Code requests:   {:.1}%", summary.code_request_percentage);
        println!("Questions:       {:.1}%", summary.question_percentage);

        println!("\nComplexity:");
        for (label, stats) in &summary.complexity_distribution {
            let avg = stats
                .avg_execution_time_ms
                .map(format_ms)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<10} {:>6}  {:>5.1}%  avg {}",
                label.as_str(),
                stats.count,
                stats.share,
                avg
            );
        }

        println!("\nTimeline:");
        for bucket in &summary.time_buckets {
            let avg = bucket
                .avg_execution_time_ms
                .map(format_ms)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  {:>5}  {}",
                bucket.start.format("%Y-%m-%d %H:%M"),
                bucket.count,
                avg
            );
        }

        print_alerts(self.alerts);
    }
}

/// Everything `pipescope recent` reports
#[derive(Serialize)]
pub struct RecentReport<'a> {
    pub hours: i64,
    pub status: &'a FetchStatus,
    pub records: Vec<&'a ExecutionRecord>,
}

impl RecentReport<'_> {
    pub fn print_text(&self) {
        println!("Recent executions (last {}h)", self.hours);
        print_status(self.status);
        println!();

        if self.records.is_empty() {
            println!("No executions found.");
            return;
        }

        for record in &self.records {
            let short_id: String = record.pipeline_id.chars().take(8).collect();
            println!(
                "{}  {:<8}  {:<8}  {:<7}  {:>8}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                short_id,
                record.complexity_label.as_str(),
                record.status.as_str(),
                format_ms(record.execution_time_ms),
                truncate(&record.user_message, MESSAGE_WIDTH)
            );
            if let Some(details) = &record.error_details {
                println!("    error: {}", details);
            }
        }
    }
}

fn print_status(status: &FetchStatus) {
    let source = match (status.source, &status.fallback) {
        (SourceKind::Live, _) => "live store".to_string(),
        (SourceKind::Mock, Some(reason)) => format!("mock data (fallback: {})", reason),
        (SourceKind::Mock, None) if status.demo_mode => "mock data (demo mode)".to_string(),
        (SourceKind::Mock, None) => "mock data".to_string(),
    };
    println!("Source: {}", source);
    if status.discarded > 0 {
        println!("Discarded malformed records: {}", status.discarded);
    }
}

fn print_alerts(alerts: &[Alert]) {
    println!("\nAlerts:");
    if alerts.is_empty() {
        println!("  (none)");
        return;
    }
    for alert in alerts {
        let icon = match alert.severity() {
            Severity::Warning => "!",
            Severity::Info => "i",
        };
        println!("  [{}] {}", icon, alert.message());
    }
}

fn format_ms(ms: f64) -> String {
    if ms >= 10_000.0 {
        format!("{:.1}s", ms / 1000.0)
    } else {
        format!("{:.0}ms", ms)
    }
}

/// "95:", "99.9:"
fn format_percentile(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{:.0}:", p)
    } else {
        format!("{}:", p)
    }
}

/// First `max` characters of a single-line rendering of `text`
fn truncate(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
