//! Error types for the picklist generation core.
//!
//! Every fallible operation returns [`PicklistError`]. The façade never lets
//! an error cross the public boundary raw: it is translated into a tagged
//! result carrying the machine-readable [`ErrorKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error taxonomy surfaced to callers and the status
/// endpoint.
///
/// Kinds, not type names: several [`PicklistError`] variants collapse onto
/// the same kind when they are indistinguishable to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request inputs failed validation before any model call.
    InvalidInput,
    /// Prompt exceeds the input ceiling even after condensation.
    TokenBudgetExceeded,
    /// Retries consumed without a successful call.
    RateLimitExhausted,
    /// Non-rate-limit provider failure.
    ApiError,
    /// Model finish reason indicates truncation.
    ResponseTruncated,
    /// Model self-reported overflow.
    DataOverflow,
    /// All parser layers returned empty.
    ParseFailed,
    /// Some batches failed; at least one succeeded.
    PartialFailure,
    /// Caller cancelled the request.
    Cancelled,
}

impl ErrorKind {
    /// Returns the snake_case string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::TokenBudgetExceeded => "token_budget_exceeded",
            Self::RateLimitExhausted => "rate_limit_exhausted",
            Self::ApiError => "api_error",
            Self::ResponseTruncated => "response_truncated",
            Self::DataOverflow => "data_overflow",
            Self::ParseFailed => "parse_failed",
            Self::PartialFailure => "partial_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the picklist generation pipeline.
#[derive(Error, Debug)]
pub enum PicklistError {
    /// No API key was found in configuration or environment.
    #[error("No API key found. Set OPENAI_API_KEY or PICKLIST_API_KEY")]
    ApiKeyMissing,

    /// Unknown provider name in configuration.
    #[error("Unsupported provider: {name}")]
    UnsupportedProvider {
        /// The provider name that failed to resolve.
        name: String,
    },

    /// Request inputs failed validation.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the request.
        message: String,
    },

    /// Compiled prompt exceeds the input-token ceiling.
    #[error("Prompt is {tokens} tokens, over the {limit}-token input budget")]
    TokenBudgetExceeded {
        /// Exact token count of the compiled prompt.
        tokens: usize,
        /// Configured input ceiling.
        limit: usize,
    },

    /// Provider signalled a rate limit for a single call. The executor
    /// consumes this variant; callers see [`Self::RateLimitExhausted`].
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Provider error surface.
        message: String,
    },

    /// Retries consumed without a successful call.
    #[error("Rate limit persisted after {attempts} attempts")]
    RateLimitExhausted {
        /// Total calls issued, including the first.
        attempts: u32,
    },

    /// Non-rate-limit provider failure.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error surface.
        message: String,
        /// HTTP status code, when one was observed.
        status: Option<u16>,
    },

    /// Model output was cut off by the output-token cap.
    #[error("Response truncated (finish_reason=length, max_tokens={max_tokens})")]
    ResponseTruncated {
        /// Output cap in force for the call.
        max_tokens: u32,
    },

    /// Model self-reported that the team list did not fit.
    #[error("Model reported data overflow for this request")]
    DataOverflow,

    /// Every parser layer came back empty.
    #[error("Failed to parse ranking response: {message}")]
    ParseFailed {
        /// Diagnostic describing the last layer's failure.
        message: String,
        /// Raw model output for postmortems.
        content: String,
    },

    /// A batch did not complete within its timeout.
    #[error("Batch {batch} timed out after {seconds}s")]
    BatchTimeout {
        /// Zero-based batch index.
        batch: usize,
        /// Configured per-batch timeout.
        seconds: u64,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled by caller")]
    Cancelled,
}

impl PicklistError {
    /// Maps this error onto the caller-facing taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ApiKeyMissing
            | Self::UnsupportedProvider { .. }
            | Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::TokenBudgetExceeded { .. } => ErrorKind::TokenBudgetExceeded,
            Self::RateLimited { .. } | Self::RateLimitExhausted { .. } => {
                ErrorKind::RateLimitExhausted
            }
            Self::ApiRequest { .. } | Self::BatchTimeout { .. } => ErrorKind::ApiError,
            Self::ResponseTruncated { .. } => ErrorKind::ResponseTruncated,
            Self::DataOverflow => ErrorKind::DataOverflow,
            Self::ParseFailed { .. } => ErrorKind::ParseFailed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns `true` if this error is a per-call rate-limit signal the
    /// executor should retry.
    #[must_use]
    pub const fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` if this error fails the whole request before any
    /// model call, regardless of batching mode.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::TokenBudgetExceeded { .. }
                | Self::ApiKeyMissing
                | Self::UnsupportedProvider { .. }
                | Self::Cancelled
        )
    }
}
