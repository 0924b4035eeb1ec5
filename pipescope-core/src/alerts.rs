//! System health alerts derived from a [`MetricsSummary`]

use crate::config::AlertConfig;
use crate::metrics::MetricsSummary;
use serde::Serialize;

/// Thresholds that trigger an alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Alert when the success rate is below this percentage
    pub min_success_rate: f64,
    /// Alert when mean response time is above this many milliseconds
    pub max_avg_response_ms: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for AlertThresholds {
    fn from(config: &AlertConfig) -> Self {
        Self {
            min_success_rate: config.min_success_rate,
            max_avg_response_ms: config.max_avg_response_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A triggered alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    LowSuccessRate { success_rate: f64, threshold: f64 },
    SlowResponses { avg_response_time_ms: f64, threshold: f64 },
    NoExecutions,
}

impl Alert {
    pub fn severity(&self) -> Severity {
        match self {
            Alert::LowSuccessRate { .. } | Alert::SlowResponses { .. } => Severity::Warning,
            Alert::NoExecutions => Severity::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Alert::LowSuccessRate {
                success_rate,
                threshold,
            } => format!(
                "Success rate {:.1}% is below {:.1}%",
                success_rate, threshold
            ),
            Alert::SlowResponses {
                avg_response_time_ms,
                threshold,
            } => format!(
                "Average response time {:.0}ms exceeds {:.0}ms",
                avg_response_time_ms, threshold
            ),
            Alert::NoExecutions => "No executions in the selected window".to_string(),
        }
    }
}

/// Alerts triggered by `summary`, warnings first.
///
/// An empty summary only yields [`Alert::NoExecutions`]; its zero success
/// rate is not a real signal.
pub fn evaluate(summary: &MetricsSummary, thresholds: &AlertThresholds) -> Vec<Alert> {
    if summary.is_empty() {
        return vec![Alert::NoExecutions];
    }

    let mut alerts = Vec::new();
    if summary.success_rate < thresholds.min_success_rate {
        alerts.push(Alert::LowSuccessRate {
            success_rate: summary.success_rate,
            threshold: thresholds.min_success_rate,
        });
    }
    if summary.avg_response_time_ms > thresholds.max_avg_response_ms {
        alerts.push(Alert::SlowResponses {
            avg_response_time_ms: summary.avg_response_time_ms,
            threshold: thresholds.max_avg_response_ms,
        });
    }

    if !alerts.is_empty() {
        tracing::debug!(count = alerts.len(), "Alerts triggered");
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: usize, success_rate: f64, avg_ms: f64) -> MetricsSummary {
        let mut summary = MetricsSummary::empty(95.0);
        summary.total_executions = total;
        summary.success_rate = success_rate;
        summary.avg_response_time_ms = avg_ms;
        summary
    }

    #[test]
    fn test_healthy_summary_has_no_alerts() {
        let alerts = evaluate(&summary(100, 98.0, 1200.0), &AlertThresholds::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_low_success_and_slow_responses() {
        let alerts = evaluate(&summary(100, 90.0, 6000.0), &AlertThresholds::default());

        assert_eq!(alerts.len(), 2);
        assert!(matches!(alerts[0], Alert::LowSuccessRate { success_rate, .. } if success_rate == 90.0));
        assert!(matches!(alerts[1], Alert::SlowResponses { .. }));
        assert!(alerts.iter().all(|a| a.severity() == Severity::Warning));
        assert_eq!(alerts[0].message(), "Success rate 90.0% is below 95.0%");
    }

    #[test]
    fn test_empty_summary_suppresses_success_alert() {
        let alerts = evaluate(&MetricsSummary::empty(95.0), &AlertThresholds::default());
        assert_eq!(alerts, vec![Alert::NoExecutions]);
        assert_eq!(alerts[0].severity(), Severity::Info);
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = AlertConfig {
            min_success_rate: 80.0,
            max_avg_response_ms: 10_000.0,
        };
        let thresholds = AlertThresholds::from(&config);
        assert!(evaluate(&summary(10, 85.0, 6000.0), &thresholds).is_empty());
    }

    #[test]
    fn test_alert_serializes_with_kind_tag() {
        let json = serde_json::to_value(Alert::NoExecutions).unwrap();
        assert_eq!(json["kind"], "no_executions");
    }
}
