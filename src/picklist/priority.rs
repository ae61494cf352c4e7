//! Priority weight validation and normalization.
//!
//! Every downstream stage (scoring, prompts, fingerprints) works from the
//! normalized list, never the caller's raw weights.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PicklistError;

/// Tolerance on the rescaled weight sum.
const SUM_TOLERANCE: f64 = 1e-3;

/// A caller-supplied priority metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    /// Metric name; must resolve against a team record.
    pub id: String,
    /// Relative importance. Non-positive and non-finite weights are
    /// rejected during normalization.
    pub weight: f64,
    /// Free-text rationale passed through to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A priority after validation and rescaling.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPriority {
    /// Metric name.
    pub id: String,
    /// Rescaled weight; the list sums to 1.0.
    pub weight: f64,
    /// The caller's original weight, preserved for display.
    pub original_weight: f64,
    /// Free-text rationale passed through to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Validates and rescales priorities so the surviving weights sum to 1.0.
///
/// Priorities with non-finite or non-positive weights are dropped with a
/// warning rather than failing the request.
///
/// # Errors
///
/// Returns [`PicklistError::InvalidInput`] when no valid priority remains.
pub fn normalize_priorities(
    priorities: &[Priority],
) -> Result<Vec<NormalizedPriority>, PicklistError> {
    let valid: Vec<&Priority> = priorities
        .iter()
        .filter(|p| {
            let keep = p.weight.is_finite() && p.weight > 0.0;
            if !keep {
                warn!(
                    priority = %p.id,
                    weight = p.weight,
                    "dropping priority with non-positive or non-finite weight"
                );
            }
            keep
        })
        .collect();

    if valid.is_empty() {
        return Err(PicklistError::InvalidInput {
            message: "no priorities with positive finite weight".to_string(),
        });
    }

    let total: f64 = valid.iter().map(|p| p.weight).sum();

    Ok(valid
        .into_iter()
        .map(|p| NormalizedPriority {
            id: p.id.clone(),
            weight: p.weight / total,
            original_weight: p.weight,
            reason: p.reason.clone(),
        })
        .collect())
}

/// Returns `true` if the normalized weights sum to 1.0 within tolerance.
#[must_use]
pub fn weights_normalized(priorities: &[NormalizedPriority]) -> bool {
    let sum: f64 = priorities.iter().map(|p| p.weight).sum();
    (sum - 1.0).abs() < SUM_TOLERANCE
}
