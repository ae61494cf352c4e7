//! Token budgeting: fast estimation for planning, exact counting for the
//! pre-call guard.
//!
//! The estimator is linear in team and priority count and is allowed to be
//! wrong; the exact counter over the compiled prompt text is authoritative
//! and runs before every call.

use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

use super::prompt::PromptFormat;
use crate::error::PicklistError;

/// Estimator coefficients for the compact prompt form.
const COMPACT_OVERHEAD: usize = 900;
/// Per-team token cost, compact form.
const COMPACT_PER_TEAM: usize = 60;
/// Per-priority token cost, compact form.
const COMPACT_PER_PRIORITY: usize = 18;

/// Estimator coefficients for the standard prompt form.
const STANDARD_OVERHEAD: usize = 1_200;
/// Per-team token cost, standard form.
const STANDARD_PER_TEAM: usize = 90;
/// Per-priority token cost, standard form.
const STANDARD_PER_PRIORITY: usize = 24;

/// Counts tokens in text. The length of the encoding is all the core needs.
pub trait TokenCounter: Send + Sync {
    /// Returns the number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize;
}

/// Tokenizer-backed counter for the configured model.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Resolves the tokenizer for `model`, falling back to `cl100k_base`
    /// for models the tiktoken registry does not know.
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::InvalidInput`] if no tokenizer can be
    /// constructed at all.
    pub fn for_model(model: &str) -> Result<Self, PicklistError> {
        let bpe = get_bpe_from_model(model)
            .or_else(|_| cl100k_base())
            .map_err(|e| PicklistError::InvalidInput {
                message: format!("tokenizer unavailable for model {model}: {e}"),
            })?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("bpe", &"<tiktoken CoreBPE>")
            .finish()
    }
}

/// Fast linear estimate of the compiled prompt size, used for planning
/// before any prompt text exists.
#[must_use]
pub const fn estimate_prompt_tokens(
    team_count: usize,
    priority_count: usize,
    format: PromptFormat,
) -> usize {
    match format {
        PromptFormat::Compact => {
            COMPACT_OVERHEAD + team_count * COMPACT_PER_TEAM + priority_count * COMPACT_PER_PRIORITY
        }
        PromptFormat::Standard => {
            STANDARD_OVERHEAD
                + team_count * STANDARD_PER_TEAM
                + priority_count * STANDARD_PER_PRIORITY
        }
    }
}

/// Input and output token ceilings enforced around every call.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    /// Maximum tokens a compiled prompt may measure.
    pub max_input_tokens: usize,
    /// Output cap passed to the model.
    pub max_output_tokens: u32,
}

impl TokenBudget {
    /// Measures the compiled prompt exactly and enforces the input ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::TokenBudgetExceeded`] when the measured
    /// count is over the ceiling.
    pub fn check_exact(
        &self,
        counter: &dyn TokenCounter,
        system: &str,
        user: &str,
    ) -> Result<usize, PicklistError> {
        let tokens = counter.count(system) + counter.count(user);
        if tokens > self.max_input_tokens {
            return Err(PicklistError::TokenBudgetExceeded {
                tokens,
                limit: self.max_input_tokens,
            });
        }
        Ok(tokens)
    }
}
