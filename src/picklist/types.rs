//! Data model for the picklist generation pipeline.
//!
//! Inputs ([`TeamRecord`], [`PicklistRequest`]) arrive from the dataset
//! layer and API glue; outputs ([`RankedEntry`], [`RankingResult`],
//! [`BatchProgress`]) are what callers and the status endpoint consume.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::priority::Priority;
use crate::error::ErrorKind;

/// A metric observation: either a season-aggregate scalar or a per-match
/// series the condenser aggregates itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Pre-aggregated scalar.
    Scalar(f64),
    /// Per-match observations.
    Series(Vec<f64>),
}

/// Raw team performance record from the dataset layer.
///
/// Unknown top-level fields are preserved in `extra` so priority ids can
/// resolve against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Team number, positive and unique within a request.
    pub team_number: u32,
    /// Display name.
    #[serde(default)]
    pub nickname: String,
    /// Scouting metrics keyed by metric name.
    #[serde(default)]
    pub metrics: HashMap<String, MetricValue>,
    /// Statbotics-derived metrics, flattened with a `statbotics_` prefix
    /// on consumption.
    #[serde(default)]
    pub statbotics: HashMap<String, f64>,
    /// Free-text superscouting notes. Only the first note travels to the
    /// model, truncated to 100 characters.
    #[serde(default)]
    pub superscouting: Vec<String>,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Role the selecting alliance is drafting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickPosition {
    /// First pick: best all-round partner.
    First,
    /// Second pick: complementary specialist.
    Second,
    /// Third pick: depth and reliability.
    Third,
}

impl PickPosition {
    /// Parses a pick position string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "first" => Some(Self::First),
            "second" => Some(Self::Second),
            "third" => Some(Self::Third),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
        }
    }
}

impl std::fmt::Display for PickPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How reference teams are sampled from the global weighted-score order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSelection {
    /// Span the order: first, median, last.
    #[default]
    TopMiddleBottom,
    /// Take the leading entries only.
    Top,
}

fn default_reference_teams_count() -> usize {
    3
}

/// A picklist generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PicklistRequest {
    /// The requesting team's number.
    pub your_team_number: u32,
    /// Role being drafted for.
    pub pick_position: PickPosition,
    /// Priority metrics with caller-supplied weights.
    pub priorities: Vec<Priority>,
    /// Teams to drop from consideration.
    #[serde(default)]
    pub exclude_teams: Vec<u32>,
    /// Optional explicit restriction of the team set.
    #[serde(default)]
    pub team_numbers: Option<Vec<u32>>,
    /// Force (true) or forbid (false) batching; `None` = planner decides.
    #[serde(default)]
    pub use_batching: Option<bool>,
    /// Caller override of the planned batch size.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Number of calibration anchors shared across batches.
    #[serde(default = "default_reference_teams_count")]
    pub reference_teams_count: usize,
    /// Reference sampling strategy.
    #[serde(default)]
    pub reference_selection: ReferenceSelection,
}

/// One entry of the returned picklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Team number.
    pub team_number: u32,
    /// Display name joined back from the input records.
    pub nickname: String,
    /// Model-assigned (or synthetic) score; the picklist is sorted on it.
    pub score: f64,
    /// Model rationale, passed through unvalidated.
    pub reasoning: String,
    /// True iff this entry was synthesized by the omission pass rather
    /// than emitted by the model.
    pub is_fallback: bool,
}

/// Terminal status of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// Every team was ranked.
    Success,
    /// Some batches failed; at least one succeeded.
    Partial,
    /// The request failed.
    Error,
}

impl ResultStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

/// Machine-readable failure detail attached to error results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Taxonomy kind.
    pub kind: ErrorKind,
    /// Short human-readable message.
    pub message: String,
}

/// Final result of a generation request, cached and returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingResult {
    /// Terminal status.
    pub status: ResultStatus,
    /// Ranked teams, best first.
    pub picklist: Vec<RankedEntry>,
    /// Batches that completed successfully (batched mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batches_processed: Option<usize>,
    /// Total batches planned (batched mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_batches: Option<usize>,
    /// Fingerprint the result is cached under.
    pub cache_key: String,
    /// Wall-clock seconds spent serving this request.
    pub processing_time_seconds: f64,
    /// Tokens consumed across every model call.
    pub total_tokens: u32,
    /// Failure detail when `status` is not `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Live progress of a batched request.
///
/// One writer (the coordinator), many readers (status queriers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Fingerprint of the owning request.
    pub cache_key: String,
    /// Total batches planned.
    pub total_batches: usize,
    /// Batches completed so far.
    pub current_batch: usize,
    /// Interpolated completion percentage in `[0, 100]`.
    pub percentage: f64,
    /// True once the final batch has completed.
    pub complete: bool,
    /// Per-batch log lines for diagnostics.
    #[serde(default)]
    pub events: Vec<String>,
    /// Merged entries so far, best first.
    #[serde(default)]
    pub partial: Vec<RankedEntry>,
    /// Unix timestamp (seconds) when the request started.
    pub started_at: f64,
}

impl BatchProgress {
    /// Creates a fresh progress record for `total_batches` batches.
    #[must_use]
    pub fn new(cache_key: &str, total_batches: usize) -> Self {
        Self {
            cache_key: cache_key.to_string(),
            total_batches,
            current_batch: 0,
            percentage: 0.0,
            complete: false,
            events: Vec::new(),
            partial: Vec::new(),
            started_at: unix_now(),
        }
    }
}

/// Seconds since the Unix epoch, saturating at zero on clock skew.
fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Snapshot served to status pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// One of `unknown`, `queued`, `in_progress`, `complete`, `failed`.
    pub status: String,
    /// Completion percentage in `[0, 100]`.
    pub percentage: f64,
    /// Batches completed so far.
    pub current_batch: usize,
    /// Total batches planned.
    pub total_batches: usize,
    /// Best-first entries ranked so far, when any exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_picklist: Option<Vec<RankedEntry>>,
}
