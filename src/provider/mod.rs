//! Pluggable LLM provider abstraction.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. This keeps all ranking logic decoupled
//! from any particular LLM vendor, and lets the test suite substitute a
//! scripted stub for the network.

pub mod message;
pub mod openai;

use async_trait::async_trait;

use crate::error::PicklistError;
use crate::picklist::config::GeneratorConfig;

pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use openai::OpenAiProvider;

/// Trait for LLM provider backends.
///
/// Implementations handle the transport layer for a specific provider while
/// presenting a uniform interface to the executor. Rate-limit failures MUST
/// surface as [`PicklistError::RateLimited`] so the retry layer can
/// distinguish them from terminal API errors.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::RateLimited`] on provider throttling and
    /// [`PicklistError::ApiRequest`] on any other transport failure.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, PicklistError>;
}

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default) — OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`PicklistError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &GeneratorConfig) -> Result<Box<dyn LlmProvider>, PicklistError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config))),
        other => Err(PicklistError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
