//! Single round-trip LLM call wrapper with budget guard and bounded retry.
//!
//! The executor is single-threaded cooperative: it yields while waiting on
//! the network or backing off, and holds one in-flight call at a time.
//! Concurrency is the batch coordinator's job, which runs multiple
//! executors' calls behind a semaphore.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::budget::{TokenBudget, TokenCounter};
use super::config::GeneratorConfig;
use super::prompt::PromptBundle;
use crate::error::PicklistError;
use crate::provider::message::{system_message, user_message};
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, TokenUsage};

/// Tagged success outcome of one executed call.
#[derive(Debug, Clone)]
pub struct LlmOutcome {
    /// Raw model output.
    pub content: String,
    /// Parsed JSON body, when the output parses as JSON.
    pub json: Option<Value>,
    /// Model finish reason.
    pub finish_reason: Option<String>,
    /// Token usage reported by the provider.
    pub usage: TokenUsage,
    /// Wall-clock time spent, including backoff sleeps.
    pub elapsed: Duration,
    /// Rate-limit retries consumed before success.
    pub retries: u32,
}

/// Executes single model calls with pre-validation and rate-limit retry.
pub struct LlmExecutor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    budget: TokenBudget,
    max_retries: u32,
    initial_retry_delay: Duration,
}

impl LlmExecutor {
    /// Creates an executor bound to a provider and configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &GeneratorConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            budget: TokenBudget {
                max_input_tokens: config.max_input_tokens,
                max_output_tokens: config.max_output_tokens,
            },
            max_retries: config.max_retries,
            initial_retry_delay: config.initial_retry_delay,
        }
    }

    /// Executes one compiled prompt.
    ///
    /// The exact token count is validated against the input ceiling before
    /// any network traffic. Rate-limit failures retry up to `max_retries`
    /// times with delays `initial_delay * 2^n`; no other failure retries.
    /// Cancellation is observed before the call and during backoff sleeps.
    ///
    /// # Errors
    ///
    /// - [`PicklistError::TokenBudgetExceeded`] before any call.
    /// - [`PicklistError::RateLimitExhausted`] when retries run out.
    /// - [`PicklistError::ResponseTruncated`] on a `length` finish reason.
    /// - [`PicklistError::DataOverflow`] when the model reports overflow.
    /// - [`PicklistError::Cancelled`] when the caller's token fires.
    /// - Any provider error, unchanged, when it is not a rate limit.
    pub async fn execute(
        &self,
        bundle: &PromptBundle,
        counter: &dyn TokenCounter,
        cancel: &CancellationToken,
    ) -> Result<LlmOutcome, PicklistError> {
        let exact = self
            .budget
            .check_exact(counter, &bundle.system, &bundle.user)?;
        debug!(
            exact,
            estimated = bundle.estimated_tokens,
            format = bundle.format.as_str(),
            teams = bundle.index_map.len(),
            "prompt within budget"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![system_message(&bundle.system), user_message(&bundle.user)],
            temperature: Some(self.temperature),
            max_tokens: Some(self.budget.max_output_tokens),
            json_mode: true,
        };

        let start = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(PicklistError::Cancelled);
            }

            let result = tokio::select! {
                () = cancel.cancelled() => return Err(PicklistError::Cancelled),
                result = self.provider.chat(&request) => result,
            };

            match result {
                Ok(response) => return self.finish(response, start, attempt),
                Err(e) if e.is_rate_limit() => {
                    if attempt >= self.max_retries {
                        warn!(attempts = attempt + 1, "rate limit retries exhausted");
                        return Err(PicklistError::RateLimitExhausted {
                            attempts: attempt + 1,
                        });
                    }
                    attempt += 1;
                    let delay = self.initial_retry_delay * 2_u32.saturating_pow(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        "rate limited, backing off"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => return Err(PicklistError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Post-processes a successful provider response.
    fn finish(
        &self,
        response: ChatResponse,
        start: Instant,
        retries: u32,
    ) -> Result<LlmOutcome, PicklistError> {
        if response.finish_reason.as_deref() == Some("length") {
            return Err(PicklistError::ResponseTruncated {
                max_tokens: self.budget.max_output_tokens,
            });
        }

        let json: Option<Value> = serde_json::from_str(&response.content).ok();

        if is_overflow(json.as_ref()) {
            return Err(PicklistError::DataOverflow);
        }

        Ok(LlmOutcome {
            content: response.content,
            json,
            finish_reason: response.finish_reason,
            usage: response.usage,
            elapsed: start.elapsed(),
            retries,
        })
    }
}

impl std::fmt::Debug for LlmExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExecutor")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Returns `true` when the body is the model's overflow sentinel, in
/// either the compact (`"s"`) or standard (`"status"`) shape.
fn is_overflow(json: Option<&Value>) -> bool {
    json.is_some_and(|v| {
        v.get("s").and_then(Value::as_str) == Some("overflow")
            || v.get("status").and_then(Value::as_str) == Some("overflow")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picklist::index_map::IndexMap;
    use crate::picklist::prompt::PromptFormat;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    /// Provider that replays a scripted sequence of results.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ChatResponse, PicklistError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ChatResponse, PicklistError>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, PicklistError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| {
                    Err(PicklistError::ApiRequest {
                        message: "script exhausted".to_string(),
                        status: None,
                    })
                })
        }
    }

    fn ok_response(content: &str) -> Result<ChatResponse, PicklistError> {
        Ok(ChatResponse {
            content: content.to_string(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
            finish_reason: Some("stop".to_string()),
        })
    }

    fn rate_limited() -> Result<ChatResponse, PicklistError> {
        Err(PicklistError::RateLimited {
            message: "429".to_string(),
        })
    }

    fn bundle() -> PromptBundle {
        PromptBundle {
            system: "rank teams".to_string(),
            user: "1=254 please".to_string(),
            index_map: IndexMap::new(vec![254]),
            estimated_tokens: 10,
            format: PromptFormat::Compact,
        }
    }

    fn executor(provider: Arc<dyn LlmProvider>) -> LlmExecutor {
        let config = GeneratorConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        LlmExecutor::new(provider, &config)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let provider = Arc::new(ScriptedProvider::new(vec![ok_response(
            r#"{"p":[[1,9.0,"good"]],"s":"ok"}"#,
        )]));
        let exec = executor(Arc::clone(&provider) as Arc<dyn LlmProvider>);
        let outcome = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(outcome.is_ok());
        let outcome = match outcome {
            Ok(o) => o,
            Err(_) => return,
        };
        assert_eq!(outcome.retries, 0);
        assert!(outcome.json.is_some());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_law_two_rate_limits_then_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            ok_response(r#"{"p":[[1,9.0,"good"]],"s":"ok"}"#),
        ]));
        let exec = executor(Arc::clone(&provider) as Arc<dyn LlmProvider>);

        let start = tokio::time::Instant::now();
        let outcome = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        let waited = start.elapsed();

        assert!(outcome.is_ok());
        assert_eq!(outcome.map(|o| o.retries).unwrap_or_default(), 2);
        assert_eq!(provider.calls(), 3);
        // Delays are 2s then 4s with the 1s base delay.
        assert_eq!(waited, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]));
        let exec = executor(Arc::clone(&provider) as Arc<dyn LlmProvider>);
        let result = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(PicklistError::RateLimitExhausted { attempts: 4 })
        ));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_api_error_does_not_retry() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(PicklistError::ApiRequest {
            message: "500".to_string(),
            status: Some(500),
        })]));
        let exec = executor(Arc::clone(&provider) as Arc<dyn LlmProvider>);
        let result = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PicklistError::ApiRequest { .. })));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_truncation_surfaces_distinct_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(ChatResponse {
            content: r#"{"p":[[1,9.0"#.to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("length".to_string()),
        })]));
        let exec = executor(provider);
        let result = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(PicklistError::ResponseTruncated { max_tokens: 4_000 })
        ));
    }

    #[tokio::test]
    async fn test_overflow_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new(vec![ok_response(
            r#"{"s":"overflow"}"#,
        )]));
        let exec = executor(provider);
        let result = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PicklistError::DataOverflow)));
    }

    #[tokio::test]
    async fn test_budget_guard_blocks_before_any_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![ok_response("{}")]));
        let config = GeneratorConfig::builder()
            .api_key("test")
            .max_input_tokens(2)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let exec = LlmExecutor::new(Arc::clone(&provider) as Arc<dyn LlmProvider>, &config);
        let result = exec
            .execute(&bundle(), &WordCounter, &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(PicklistError::TokenBudgetExceeded { .. })
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_before_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![ok_response("{}")]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let exec = executor(Arc::clone(&provider) as Arc<dyn LlmProvider>);
        let result = exec.execute(&bundle(), &WordCounter, &cancel).await;
        assert!(matches!(result, Err(PicklistError::Cancelled)));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_overflow_detection_shapes() {
        let compact: Value = serde_json::json!({"s": "overflow"});
        let standard: Value = serde_json::json!({"status": "overflow"});
        let ok: Value = serde_json::json!({"s": "ok"});
        assert!(is_overflow(Some(&compact)));
        assert!(is_overflow(Some(&standard)));
        assert!(!is_overflow(Some(&ok)));
        assert!(!is_overflow(None));
    }
}
