//! Request planning: single call vs. batched decomposition.
//!
//! A pure function of the dataset shape and configuration (no I/O, fully
//! deterministic), so the decision is easy to test at the boundaries.

use tracing::warn;

use super::budget::estimate_prompt_tokens;
use super::config::GeneratorConfig;
use super::prompt::PromptFormat;

/// Share of the input budget the estimator may project before the planner
/// forces batching, in percent.
const BUDGET_MARGIN_PCT: usize = 80;

/// Priority count at which batches shrink by one team.
const PRIORITY_SHRINK_ONE: usize = 4;
/// Priority count above which batches shrink by two teams.
const PRIORITY_SHRINK_TWO: usize = 5;
/// Priority count above which the planner forces batching.
const PRIORITY_BATCH_TRIGGER: usize = 6;

/// Bounds on the computed batch size.
const MIN_BATCH_SIZE: usize = 15;
/// Upper bound on the computed batch size.
const MAX_BATCH_SIZE: usize = 25;

/// Execution strategy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One LLM round-trip over the whole team set.
    Single,
    /// Decompose into batches coordinated by the batch coordinator.
    Batched,
}

/// The planner's decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Chosen strategy.
    pub strategy: Strategy,
    /// Teams per batch (meaningful in batched mode).
    pub batch_size: usize,
    /// Estimator projection for a single-call prompt, for logging.
    pub estimated_tokens: usize,
}

/// Decides single vs. batched execution and the batch size.
///
/// An explicit caller choice is honored even when the planner disagrees
/// (with a warning). Otherwise the request batches iff the team count
/// exceeds the single-processing threshold, the estimator projects more
/// than 80% of the input budget, or more than six priorities are in play.
#[must_use]
pub fn plan_request(
    team_count: usize,
    priority_count: usize,
    use_batching: Option<bool>,
    batch_size_override: Option<usize>,
    config: &GeneratorConfig,
) -> ExecutionPlan {
    let format = if config.use_ultra_compact_prompt {
        PromptFormat::Compact
    } else {
        PromptFormat::Standard
    };
    let estimated_tokens = estimate_prompt_tokens(team_count, priority_count, format);

    let over_threshold = team_count > config.single_processing_threshold;
    let over_margin = estimated_tokens * 100 > config.max_input_tokens * BUDGET_MARGIN_PCT;
    let many_priorities = priority_count > PRIORITY_BATCH_TRIGGER;
    let recommend_batching = over_threshold || over_margin || many_priorities;

    let strategy = match use_batching {
        Some(true) => Strategy::Batched,
        Some(false) => Strategy::Single,
        None => {
            if recommend_batching {
                Strategy::Batched
            } else {
                Strategy::Single
            }
        }
    };

    if use_batching.is_some() && (strategy == Strategy::Batched) != recommend_batching {
        warn!(
            team_count,
            priority_count,
            estimated_tokens,
            requested = ?strategy,
            "caller-forced strategy differs from the planner recommendation"
        );
    }

    let batch_size = batch_size_override.map_or_else(
        || {
            let shrink = if priority_count > PRIORITY_SHRINK_TWO {
                2
            } else if priority_count >= PRIORITY_SHRINK_ONE {
                1
            } else {
                0
            };
            config
                .default_batch_size
                .saturating_sub(shrink)
                .clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
        },
        |override_size| override_size.max(1),
    );

    ExecutionPlan {
        strategy,
        batch_size,
        estimated_tokens,
    }
}
