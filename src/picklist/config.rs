//! Generator configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::PicklistError;

/// Default model identifier (also selects the tokenizer).
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default input-token ceiling for a single compiled prompt.
const DEFAULT_MAX_INPUT_TOKENS: usize = 100_000;
/// Default output-token cap per call.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4_000;
/// Default sampling temperature. Near zero for ranking stability.
const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default retry attempts on rate-limit.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base retry delay. Effective first sleep is 2s (`base * 2^1`).
const DEFAULT_INITIAL_RETRY_DELAY_SECS: f64 = 1.0;
/// Default teams per batch.
const DEFAULT_BATCH_SIZE: usize = 20;
/// Team count at or below which a single call is preferred.
const DEFAULT_SINGLE_PROCESSING_THRESHOLD: usize = 20;
/// Default hard timeout per batch.
const DEFAULT_PER_BATCH_TIMEOUT_SECS: u64 = 60;
/// Default cache entry lifetime.
const DEFAULT_CACHE_TTL_SECS: u64 = 3_600;
/// Upper bound on cooperative batch parallelism.
const MAX_PARALLEL_BATCHES: usize = 3;

/// Configuration for the picklist generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier. Also selects the tokenizer for exact counting.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Input-token ceiling enforced before every call.
    pub max_input_tokens: usize,
    /// Output-token cap per call.
    pub max_output_tokens: u32,
    /// Maximum retry attempts on rate-limit.
    pub max_retries: u32,
    /// Base retry delay; attempt `n` sleeps `base * 2^n`.
    pub initial_retry_delay: Duration,
    /// Teams per batch before priority-count shaping.
    pub default_batch_size: usize,
    /// Team count at or below which a single call is preferred.
    pub single_processing_threshold: usize,
    /// Hard timeout per batch; expiry surfaces as a batch failure.
    pub per_batch_timeout: Duration,
    /// Cache entry lifetime.
    pub cache_ttl: Duration,
    /// Use the ultra-compact prompt format (default) instead of standard.
    pub use_ultra_compact_prompt: bool,
    /// Cooperative batch parallelism (1 = sequential, clamped to 3).
    pub max_parallel_batches: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from files in this directory,
    /// falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Creates a new builder for `GeneratorConfig`.
    #[must_use]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, PicklistError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_input_tokens: Option<usize>,
    max_output_tokens: Option<u32>,
    max_retries: Option<u32>,
    initial_retry_delay: Option<Duration>,
    default_batch_size: Option<usize>,
    single_processing_threshold: Option<usize>,
    per_batch_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    use_ultra_compact_prompt: Option<bool>,
    max_parallel_batches: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl GeneratorConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("PICKLIST_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("PICKLIST_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("PICKLIST_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("PICKLIST_MODEL").ok();
        }
        if self.max_retries.is_none() {
            self.max_retries = std::env::var("PICKLIST_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.default_batch_size.is_none() {
            self.default_batch_size = std::env::var("PICKLIST_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_parallel_batches.is_none() {
            self.max_parallel_batches = std::env::var("PICKLIST_MAX_PARALLEL_BATCHES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("PICKLIST_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the input-token ceiling.
    #[must_use]
    pub const fn max_input_tokens(mut self, n: usize) -> Self {
        self.max_input_tokens = Some(n);
        self
    }

    /// Sets the output-token cap.
    #[must_use]
    pub const fn max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    /// Sets the maximum retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the base retry delay.
    #[must_use]
    pub const fn initial_retry_delay(mut self, d: Duration) -> Self {
        self.initial_retry_delay = Some(d);
        self
    }

    /// Sets the default batch size.
    #[must_use]
    pub const fn default_batch_size(mut self, n: usize) -> Self {
        self.default_batch_size = Some(n);
        self
    }

    /// Sets the single-processing threshold.
    #[must_use]
    pub const fn single_processing_threshold(mut self, n: usize) -> Self {
        self.single_processing_threshold = Some(n);
        self
    }

    /// Sets the per-batch timeout.
    #[must_use]
    pub const fn per_batch_timeout(mut self, d: Duration) -> Self {
        self.per_batch_timeout = Some(d);
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub const fn cache_ttl(mut self, d: Duration) -> Self {
        self.cache_ttl = Some(d);
        self
    }

    /// Selects ultra-compact (true) or standard (false) prompt format.
    #[must_use]
    pub const fn use_ultra_compact_prompt(mut self, v: bool) -> Self {
        self.use_ultra_compact_prompt = Some(v);
        self
    }

    /// Sets the cooperative batch parallelism (clamped to `[1, 3]`).
    #[must_use]
    pub const fn max_parallel_batches(mut self, n: usize) -> Self {
        self.max_parallel_batches = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<GeneratorConfig, PicklistError> {
        let api_key = self.api_key.ok_or(PicklistError::ApiKeyMissing)?;

        Ok(GeneratorConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_input_tokens: self.max_input_tokens.unwrap_or(DEFAULT_MAX_INPUT_TOKENS),
            max_output_tokens: self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_retry_delay: self
                .initial_retry_delay
                .unwrap_or(Duration::from_secs_f64(DEFAULT_INITIAL_RETRY_DELAY_SECS)),
            default_batch_size: self.default_batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            single_processing_threshold: self
                .single_processing_threshold
                .unwrap_or(DEFAULT_SINGLE_PROCESSING_THRESHOLD),
            per_batch_timeout: self
                .per_batch_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_PER_BATCH_TIMEOUT_SECS)),
            cache_ttl: self
                .cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            use_ultra_compact_prompt: self.use_ultra_compact_prompt.unwrap_or(true),
            max_parallel_batches: self
                .max_parallel_batches
                .unwrap_or(1)
                .clamp(1, MAX_PARALLEL_BATCHES),
            prompt_dir: self.prompt_dir,
        })
    }
}
