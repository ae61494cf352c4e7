//! Public façade composing the whole pipeline.
//!
//! `generate` never raises: every failure is translated into a tagged
//! [`RankingResult`] with a machine-readable kind, and the cache is left
//! clean (in-flight markers cleared on terminal errors).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::budget::{TiktokenCounter, TokenCounter};
use super::cache::{CacheEntry, MemoryCache, PicklistCache, fingerprint, status_report};
use super::condense::{CondensedTeam, condense_teams};
use super::config::GeneratorConfig;
use super::coordinator::{BatchCoordinator, RequestProfile, merge_entries};
use super::dataset::DatasetSource;
use super::executor::LlmExecutor;
use super::parser::{ParsedEntry, ResponseParser, join_nicknames};
use super::planner::{Strategy, plan_request};
use super::priority::normalize_priorities;
use super::prompt::{PromptFormat, PromptSet, build_ranking_prompt};
use super::types::{
    ErrorInfo, PicklistRequest, RankedEntry, RankingResult, ResultStatus, StatusReport, TeamRecord,
};
use crate::error::{ErrorKind, PicklistError};
use crate::provider::{LlmProvider, TokenUsage, create_provider};

/// Score step between consecutive fallback entries, preserving the
/// weighted-score order among teams the model never ranked.
const FALLBACK_SCORE_STEP: f64 = 0.01;

/// The picklist generation engine.
///
/// Owns every pipeline component for the lifetime of the process; nothing
/// is shared across requests except the cache.
pub struct PicklistGenerator {
    cache: Arc<dyn PicklistCache>,
    counter: Arc<dyn TokenCounter>,
    config: GeneratorConfig,
    prompts: Arc<PromptSet>,
    executor: Arc<LlmExecutor>,
    parser: Arc<ResponseParser>,
    coordinator: BatchCoordinator,
}

impl PicklistGenerator {
    /// Creates a generator over explicit components.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        cache: Arc<dyn PicklistCache>,
        counter: Arc<dyn TokenCounter>,
        config: GeneratorConfig,
    ) -> Self {
        let prompts = Arc::new(PromptSet::load(config.prompt_dir.as_deref()));
        let executor = Arc::new(LlmExecutor::new(provider, &config));
        let parser = Arc::new(ResponseParser::new());
        let coordinator = BatchCoordinator::new(
            Arc::clone(&executor),
            Arc::clone(&parser),
            Arc::clone(&prompts),
            Arc::clone(&cache),
            Arc::clone(&counter),
            config.clone(),
        );
        Self {
            cache,
            counter,
            config,
            prompts,
            executor,
            parser,
            coordinator,
        }
    }

    /// Creates a generator from configuration alone: provider registry,
    /// in-memory cache, and the model's tokenizer.
    ///
    /// # Errors
    ///
    /// Returns [`PicklistError::UnsupportedProvider`] or
    /// [`PicklistError::InvalidInput`] when the provider or tokenizer
    /// cannot be constructed.
    pub fn from_config(config: GeneratorConfig) -> Result<Self, PicklistError> {
        let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config)?);
        let cache = Arc::new(MemoryCache::new(config.cache_ttl));
        let counter = Arc::new(TiktokenCounter::for_model(&config.model)?);
        Ok(Self::new(provider, cache, counter, config))
    }

    /// Serves the status endpoint for a cache key.
    #[must_use]
    pub fn status(&self, cache_key: &str) -> StatusReport {
        status_report(self.cache.lookup(cache_key).as_ref())
    }

    /// Generates a picklist. Never returns an error: failures surface as
    /// tagged results.
    pub async fn generate(
        &self,
        source: &dyn DatasetSource,
        request: &PicklistRequest,
    ) -> RankingResult {
        self.generate_cancellable(source, request, CancellationToken::new())
            .await
    }

    /// Generates a picklist under a caller-owned cancellation token.
    ///
    /// Cancellation is cooperative: in-flight calls are abandoned at the
    /// next suspension point, no further batches start, and the cache
    /// entry is marked failed.
    pub async fn generate_cancellable(
        &self,
        source: &dyn DatasetSource,
        request: &PicklistRequest,
        cancel: CancellationToken,
    ) -> RankingResult {
        let start = Instant::now();
        match self.run_pipeline(source, request, &cancel, start).await {
            Ok(result) => result,
            Err((key, error)) => self.fail(&key, &error, start),
        }
    }

    fn format(&self) -> PromptFormat {
        if self.config.use_ultra_compact_prompt {
            PromptFormat::Compact
        } else {
            PromptFormat::Standard
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn run_pipeline(
        &self,
        source: &dyn DatasetSource,
        request: &PicklistRequest,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<RankingResult, (String, PicklistError)> {
        let priorities =
            normalize_priorities(&request.priorities).map_err(|e| (String::new(), e))?;
        let key = fingerprint(request, &priorities);

        match self.cache.lookup(&key) {
            Some(CacheEntry::Ready(mut cached)) if cached.status != ResultStatus::Error => {
                debug!(key, "cache hit");
                cached.processing_time_seconds = start.elapsed().as_secs_f64();
                return Ok(cached);
            }
            Some(CacheEntry::Ready(_)) => {
                // A cached failure (e.g. a cancelled run) does not block a
                // fresh attempt.
                self.cache.remove(&key);
            }
            _ => {}
        }
        if !self.cache.reserve(&key) {
            // Leave the first writer's entry alone: report with an empty
            // key so the failure path does not clear it.
            return Err((
                String::new(),
                PicklistError::InvalidInput {
                    message: format!(
                        "identical request already in flight; poll status with cache key {key}"
                    ),
                },
            ));
        }

        let records = source.team_records().map_err(|e| (key.clone(), e))?;
        let records = filter_records(records, request);
        if records.is_empty() {
            return Err((
                key,
                PicklistError::InvalidInput {
                    message: "no teams remain after exclusions and restrictions".to_string(),
                },
            ));
        }

        let mut teams = condense_teams(&records, &priorities);
        teams.sort_by(|a, b| {
            b.weighted_score
                .total_cmp(&a.weighted_score)
                .then_with(|| a.team_number.cmp(&b.team_number))
        });

        let nicknames: HashMap<u32, String> = teams
            .iter()
            .map(|t| (t.team_number, t.nickname.clone()))
            .collect();
        let valid: HashSet<u32> = teams.iter().map(|t| t.team_number).collect();

        let profile = RequestProfile {
            your_team_number: request.your_team_number,
            your_team: teams
                .iter()
                .find(|t| t.team_number == request.your_team_number)
                .cloned(),
            pick_position: request.pick_position,
            priorities: priorities.clone(),
            game_context: source.game_context(),
        };

        let plan = plan_request(
            teams.len(),
            priorities.len(),
            request.use_batching,
            request.batch_size,
            &self.config,
        );
        info!(
            key,
            teams = teams.len(),
            strategy = ?plan.strategy,
            batch_size = plan.batch_size,
            estimated_tokens = plan.estimated_tokens,
            "picklist request planned"
        );

        let mut usage = TokenUsage::default();
        let mut batches_processed = None;
        let mut total_batches = None;
        let mut failures = Vec::new();

        let mut entries: Vec<ParsedEntry> = match plan.strategy {
            Strategy::Single => {
                let bundle =
                    build_ranking_prompt(&self.prompts, &profile.context(), &teams, self.format());
                let outcome = self
                    .executor
                    .execute(&bundle, self.counter.as_ref(), cancel)
                    .await
                    .map_err(|e| (key.clone(), e))?;
                usage = usage.add(outcome.usage);
                let (parsed, layer) = self.parser.parse(
                    &outcome.content,
                    outcome.json.as_ref(),
                    Some(&bundle.index_map),
                );
                debug!(layer, count = parsed.len(), "single call parsed");
                merge_entries(parsed, &valid)
            }
            Strategy::Batched => {
                let report = self
                    .coordinator
                    .run(
                        &key,
                        &profile,
                        &teams,
                        plan.batch_size,
                        request.reference_teams_count,
                        request.reference_selection,
                        cancel,
                    )
                    .await
                    .map_err(|e| (key.clone(), e))?;
                if report.batches_processed == 0 {
                    let error = report.failures.into_iter().next().map_or_else(
                        || PicklistError::ApiRequest {
                            message: "all batches failed".to_string(),
                            status: None,
                        },
                        |(_, e)| e,
                    );
                    return Err((key, error));
                }
                usage = usage.add(report.usage);
                batches_processed = Some(report.batches_processed);
                total_batches = Some(report.total_batches);
                failures = report.failures;
                report.entries
            }
        };

        if entries.is_empty() {
            return Err((
                key,
                PicklistError::ParseFailed {
                    message: "model produced no usable ranking entries".to_string(),
                    content: String::new(),
                },
            ));
        }

        // Omission pass: at most one, then synthetic fallbacks.
        let produced: HashSet<u32> = entries.iter().map(|e| e.team_number).collect();
        let omitted: Vec<CondensedTeam> = teams
            .iter()
            .filter(|t| !produced.contains(&t.team_number))
            .cloned()
            .collect();
        if !omitted.is_empty() && !cancel.is_cancelled() {
            info!(omitted = omitted.len(), "running omission pass");
            let context = join_nicknames(entries.clone(), &nicknames);
            let (recovered, omission_usage) = self
                .coordinator
                .rerank_omitted(&profile, &context, &omitted, cancel)
                .await;
            usage = usage.add(omission_usage);
            entries = merge_entries(entries.into_iter().chain(recovered), &valid);
        }

        let produced: HashSet<u32> = entries.iter().map(|e| e.team_number).collect();
        let fallback_teams: Vec<&CondensedTeam> = teams
            .iter()
            .filter(|t| !produced.contains(&t.team_number))
            .collect();
        let fallback_set: HashSet<u32> =
            fallback_teams.iter().map(|t| t.team_number).collect();
        if !fallback_teams.is_empty() {
            warn!(
                missing = fallback_teams.len(),
                "filling residual gap with fallback entries"
            );
            let floor = entries
                .iter()
                .map(|e| e.score)
                .fold(f64::INFINITY, f64::min);
            let base = if floor.is_finite() { floor - 1.0 } else { 0.0 };
            for (i, team) in fallback_teams.iter().enumerate() {
                entries.push(ParsedEntry {
                    team_number: team.team_number,
                    score: base - i as f64 * FALLBACK_SCORE_STEP,
                    reasoning: "Not ranked by the model; placed from weighted-score order"
                        .to_string(),
                });
            }
        }

        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.team_number.cmp(&b.team_number))
        });

        let picklist: Vec<RankedEntry> = entries
            .into_iter()
            .map(|e| RankedEntry {
                team_number: e.team_number,
                nickname: nicknames.get(&e.team_number).cloned().unwrap_or_default(),
                score: e.score,
                reasoning: e.reasoning,
                is_fallback: fallback_set.contains(&e.team_number),
            })
            .collect();

        let status = if failures.is_empty() {
            ResultStatus::Success
        } else {
            ResultStatus::Partial
        };
        let error = (status == ResultStatus::Partial).then(|| ErrorInfo {
            kind: ErrorKind::PartialFailure,
            message: format!(
                "{} of {} batches failed",
                failures.len(),
                total_batches.unwrap_or(0)
            ),
        });

        let result = RankingResult {
            status,
            picklist,
            batches_processed,
            total_batches,
            cache_key: key.clone(),
            processing_time_seconds: start.elapsed().as_secs_f64(),
            total_tokens: usage.total_tokens,
            error,
        };
        self.cache.publish(&key, CacheEntry::Ready(result.clone()));
        info!(
            key,
            status = result.status.as_str(),
            teams = result.picklist.len(),
            tokens = result.total_tokens,
            "picklist request finished"
        );
        Ok(result)
    }

    /// Translates a pipeline error into a tagged result and cleans the
    /// cache: cancelled requests are marked failed, every other terminal
    /// error clears the in-flight marker entirely.
    fn fail(&self, key: &str, error: &PicklistError, start: Instant) -> RankingResult {
        let kind = error.kind();
        warn!(%error, kind = %kind, "picklist request failed");
        let result = RankingResult {
            status: ResultStatus::Error,
            picklist: Vec::new(),
            batches_processed: None,
            total_batches: None,
            cache_key: key.to_string(),
            processing_time_seconds: start.elapsed().as_secs_f64(),
            total_tokens: 0,
            error: Some(ErrorInfo {
                kind,
                message: error.to_string(),
            }),
        };
        if !key.is_empty() {
            if kind == ErrorKind::Cancelled {
                self.cache
                    .publish(key, CacheEntry::Ready(result.clone()));
            } else {
                self.cache.remove(key);
            }
        }
        result
    }
}

impl std::fmt::Debug for PicklistGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PicklistGenerator")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

/// Applies the exclusion list and optional allow-list.
fn filter_records(records: Vec<TeamRecord>, request: &PicklistRequest) -> Vec<TeamRecord> {
    let excluded: HashSet<u32> = request.exclude_teams.iter().copied().collect();
    let allowed: Option<HashSet<u32>> = request
        .team_numbers
        .as_ref()
        .map(|numbers| numbers.iter().copied().collect());

    records
        .into_iter()
        .filter(|r| {
            !excluded.contains(&r.team_number)
                && allowed.as_ref().is_none_or(|a| a.contains(&r.team_number))
        })
        .collect()
}
