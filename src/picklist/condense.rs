//! Condenser and weighted scorer.
//!
//! Reduces raw [`TeamRecord`]s to compact per-team objects sized for the
//! prompt, and pre-computes the weighted score the model is asked to rank
//! around. Inputs are never mutated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::priority::NormalizedPriority;
use super::types::{MetricValue, TeamRecord};

/// Essential scalar metrics carried into the condensed object.
const ESSENTIAL_METRICS: &[&str] = &[
    "auto_points",
    "teleop_points",
    "endgame_points",
    "total_points",
    "defense_rating",
    "driver_skill",
    "consistency",
];

/// Priority-id aliases resolved when the literal id does not match.
const METRIC_ALIASES: &[(&str, &str)] = &[
    ("auto", "auto_points"),
    ("teleop", "teleop_points"),
    ("endgame", "endgame_points"),
    ("total", "total_points"),
    ("defense", "defense_rating"),
];

/// Character cap on the superscouting note carried to the model.
const NOTE_MAX_CHARS: usize = 100;

/// A team record reduced to what the prompt needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondensedTeam {
    /// Team number.
    pub team_number: u32,
    /// Display name.
    pub nickname: String,
    /// Essential metrics plus `statbotics_`-prefixed entries. `BTreeMap`
    /// keeps prompt serialization byte-deterministic.
    pub metrics: BTreeMap<String, f64>,
    /// First superscouting note, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Pre-computed weighted score in the priority space.
    pub weighted_score: f64,
}

/// Aggregates per-match observations: median for three or more, mean
/// otherwise.
fn aggregate(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.len() >= 3 {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            f64::midpoint(sorted[mid - 1], sorted[mid])
        } else {
            sorted[mid]
        }
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Extracts a metric value from a record's metrics map, aggregating
/// series observations.
fn metric_value(record: &TeamRecord, id: &str) -> Option<f64> {
    record.metrics.get(id).map(|v| match v {
        MetricValue::Scalar(s) => *s,
        MetricValue::Series(series) => aggregate(series),
    })
}

/// Resolves a priority id against a record.
///
/// Resolution order: `metrics[id]`, `statbotics[id]`, `statbotics_<id>`
/// top-level, direct top-level fields, then the alias map. Returns `None`
/// when nothing matches; the scorer skips, never zeroes, such priorities.
fn resolve(record: &TeamRecord, id: &str) -> Option<f64> {
    if let Some(v) = metric_value(record, id) {
        return Some(v);
    }
    if let Some(v) = record.statbotics.get(id) {
        return Some(*v);
    }
    if let Some(stripped) = id.strip_prefix("statbotics_")
        && let Some(v) = record.statbotics.get(stripped)
    {
        return Some(*v);
    }
    if let Some(v) = record.extra.get(id).and_then(serde_json::Value::as_f64) {
        return Some(v);
    }
    METRIC_ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .and_then(|(_, target)| {
            metric_value(record, target)
                .or_else(|| record.statbotics.get(*target).copied())
                .or_else(|| record.extra.get(*target).and_then(serde_json::Value::as_f64))
        })
}

/// Truncates a note to the character cap, respecting char boundaries.
fn truncate_note(note: &str) -> String {
    note.chars().take(NOTE_MAX_CHARS).collect()
}

/// Condenses raw records and computes weighted scores.
///
/// The weighted score normalizes each resolved priority value by the
/// maximum magnitude of that metric across the request's team set, so
/// priorities on different scales contribute comparably. Unresolvable
/// priorities are skipped in both numerator and denominator; a team with
/// no resolvable priority scores 0.
#[must_use]
pub fn condense_teams(
    records: &[TeamRecord],
    priorities: &[NormalizedPriority],
) -> Vec<CondensedTeam> {
    // Resolve priority values per team before scoring so the per-metric
    // normalization can see the whole team set.
    let resolved: Vec<Vec<Option<f64>>> = records
        .iter()
        .map(|record| priorities.iter().map(|p| resolve(record, &p.id)).collect())
        .collect();

    let max_magnitude: Vec<f64> = (0..priorities.len())
        .map(|i| {
            resolved
                .iter()
                .filter_map(|team| team[i])
                .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        })
        .collect();

    records
        .iter()
        .zip(&resolved)
        .map(|(record, values)| {
            let mut metrics = BTreeMap::new();
            for &name in ESSENTIAL_METRICS {
                if let Some(v) = metric_value(record, name) {
                    metrics.insert(name.to_string(), round2(v));
                }
            }
            for (key, value) in &record.statbotics {
                metrics.insert(format!("statbotics_{key}"), round2(*value));
            }

            let notes = record.superscouting.first().map(|n| truncate_note(n));

            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for (i, priority) in priorities.iter().enumerate() {
                if let Some(v) = values[i] {
                    let normalized = if max_magnitude[i] > 0.0 {
                        v / max_magnitude[i]
                    } else {
                        0.0
                    };
                    numerator += normalized * priority.weight;
                    denominator += priority.weight;
                }
            }
            let weighted_score = if denominator > 0.0 {
                round3(numerator / denominator)
            } else {
                0.0
            };

            CondensedTeam {
                team_number: record.team_number,
                nickname: record.nickname.clone(),
                metrics,
                notes,
                weighted_score,
            }
        })
        .collect()
}
