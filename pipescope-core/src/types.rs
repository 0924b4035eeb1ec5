//! Core domain types for pipescope
//!
//! These types describe one pipeline run ([`ExecutionRecord`]) and the
//! vocabulary the classifier, generator and aggregator share.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Execution record** | One logged pipeline run with timing, status, and input/output text |
//! | **Complexity label** | Ordinal difficulty band of the run's input message |
//! | **Window** | Closed time interval `[start, end]` records are requested for |
//! | **Live store** | The external key-attribute store holding real execution logs |
//! | **Mock data** | Synthetic records standing in for the live store |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Complexity
// ============================================

/// Ordinal complexity band of an input message.
///
/// Ordering follows difficulty: `Simple < Moderate < Complex < Advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLabel {
    Simple,
    Moderate,
    Complex,
    Advanced,
}

impl ComplexityLabel {
    /// All labels in ascending order.
    pub const ALL: [ComplexityLabel; 4] = [
        ComplexityLabel::Simple,
        ComplexityLabel::Moderate,
        ComplexityLabel::Complex,
        ComplexityLabel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLabel::Simple => "simple",
            ComplexityLabel::Moderate => "moderate",
            ComplexityLabel::Complex => "complex",
            ComplexityLabel::Advanced => "advanced",
        }
    }

    /// Zero-based position of this label in [`ComplexityLabel::ALL`].
    pub fn rank(&self) -> usize {
        match self {
            ComplexityLabel::Simple => 0,
            ComplexityLabel::Moderate => 1,
            ComplexityLabel::Complex => 2,
            ComplexityLabel::Advanced => 3,
        }
    }
}

impl std::fmt::Display for ComplexityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplexityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(ComplexityLabel::Simple),
            "moderate" => Ok(ComplexityLabel::Moderate),
            "complex" => Ok(ComplexityLabel::Complex),
            "advanced" => Ok(ComplexityLabel::Advanced),
            _ => Err(format!("unknown complexity label: {}", s)),
        }
    }
}

/// Features the classifier derives from a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFeatures {
    /// Characters in the trimmed message
    pub char_count: usize,
    /// Whitespace-separated words
    pub word_count: usize,
    /// Clause estimate: 1 + separators (`,` `;`) + connective words; 0 when empty
    pub clause_count: usize,
    /// Distinct technical keywords present
    pub technical_terms: usize,
    /// Message contains code markers
    pub has_code: bool,
    /// Message reads as a question
    pub has_question: bool,
}

// ============================================
// Execution status
// ============================================

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

impl ExecutionStatus {
    /// Convert to string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failure => "FAILED",
        }
    }

    /// Parse a stored status. Unknown values yield `None`.
    pub fn from_storage(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "SUCCEEDED" => Some(ExecutionStatus::Success),
            "FAILED" | "FAILURE" | "ERROR" => Some(ExecutionStatus::Failure),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

// ============================================
// Execution record
// ============================================

/// One pipeline run.
///
/// Records are never mutated after creation. `complexity_label` and
/// `features` always come from running [`crate::classify`] on
/// `user_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier assigned at creation
    pub pipeline_id: String,
    /// When the execution occurred
    pub timestamp: DateTime<Utc>,
    /// Free-text input to the pipeline
    pub user_message: String,
    /// Complexity band derived from `user_message`
    pub complexity_label: ComplexityLabel,
    /// Features behind `complexity_label`
    pub features: MessageFeatures,
    /// Wall-clock duration, always >= 0 (failed runs included)
    pub execution_time_ms: f64,
    pub status: ExecutionStatus,
    /// Pipeline output, empty on failure
    pub final_response: String,
    /// Failure description, `None` for successful runs
    pub error_details: Option<String>,
}

// ============================================
// Time window
// ============================================

/// Closed time interval `[start, end]` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, or `None` when `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Window covering the `hours` leading up to `now`.
    ///
    /// Returns `None` for non-positive `hours` or a start before the
    /// representable range.
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Option<Self> {
        if hours <= 0 {
            return None;
        }
        let start = now.checked_sub_signed(Duration::try_hours(hours)?)?;
        Self::new(start, now)
    }

    /// Whether `ts` lies within the window (both ends inclusive).
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Window length in fractional hours.
    pub fn hours(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 3_600_000.0
    }
}
