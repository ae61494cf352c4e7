//! Batch coordination: split, execute, track progress, merge, and rerank
//! omissions.
//!
//! Batches run behind a semaphore (default one permit, at most three) so
//! cooperative parallelism never exceeds the shared rate-limit budget. A
//! once-per-second ticker publishes interpolated progress to the cache
//! while batches are in flight.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::budget::TokenCounter;
use super::cache::{CacheEntry, PicklistCache};
use super::condense::CondensedTeam;
use super::config::GeneratorConfig;
use super::executor::LlmExecutor;
use super::parser::{ParsedEntry, ResponseParser, join_nicknames};
use super::prompt::{
    PromptContext, PromptFormat, PromptSet, build_omission_prompt, build_ranking_prompt,
};
use super::priority::NormalizedPriority;
use super::types::{BatchProgress, PickPosition, RankedEntry, ReferenceSelection};
use crate::error::PicklistError;
use crate::provider::TokenUsage;

/// Cap on one in-flight batch's interpolated share, so the percentage
/// never crosses the next batch boundary early.
const INTERPOLATION_CAP: f64 = 0.95;

/// Owned request-level context shared by every batch task.
#[derive(Debug, Clone)]
pub struct RequestProfile {
    /// The requesting team's number.
    pub your_team_number: u32,
    /// Condensed profile of the requesting team, when present.
    pub your_team: Option<CondensedTeam>,
    /// Role being drafted for.
    pub pick_position: PickPosition,
    /// Normalized priorities.
    pub priorities: Vec<NormalizedPriority>,
    /// Optional game-context string.
    pub game_context: Option<String>,
}

impl RequestProfile {
    /// Borrows this profile as a prompt context.
    #[must_use]
    pub fn context(&self) -> PromptContext<'_> {
        PromptContext {
            your_team_number: self.your_team_number,
            your_team: self.your_team.as_ref(),
            pick_position: self.pick_position,
            priorities: &self.priorities,
            game_context: self.game_context.as_deref(),
        }
    }
}

/// Outcome of a batched run.
#[derive(Debug)]
pub struct BatchRunReport {
    /// Merged entries over successful batches: deduped, best score kept,
    /// sorted descending.
    pub entries: Vec<ParsedEntry>,
    /// Batches that completed successfully.
    pub batches_processed: usize,
    /// Batches planned.
    pub total_batches: usize,
    /// Per-batch failures, in batch-index order.
    pub failures: Vec<(usize, PicklistError)>,
    /// Token usage accumulated over successful calls.
    pub usage: TokenUsage,
}

/// Shared mutable progress, one writer per batch plus the ticker.
struct ProgressState {
    progress: BatchProgress,
    in_flight: HashMap<usize, Instant>,
    merged: Vec<ParsedEntry>,
}

/// Coordinates batched execution for one request at a time.
pub struct BatchCoordinator {
    executor: Arc<LlmExecutor>,
    parser: Arc<ResponseParser>,
    prompts: Arc<PromptSet>,
    cache: Arc<dyn PicklistCache>,
    counter: Arc<dyn TokenCounter>,
    config: GeneratorConfig,
}

impl BatchCoordinator {
    /// Creates a coordinator over shared pipeline components.
    #[must_use]
    pub const fn new(
        executor: Arc<LlmExecutor>,
        parser: Arc<ResponseParser>,
        prompts: Arc<PromptSet>,
        cache: Arc<dyn PicklistCache>,
        counter: Arc<dyn TokenCounter>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            executor,
            parser,
            prompts,
            cache,
            counter,
            config,
        }
    }

    fn format(&self) -> PromptFormat {
        if self.config.use_ultra_compact_prompt {
            PromptFormat::Compact
        } else {
            PromptFormat::Standard
        }
    }

    /// Splits the team list into contiguous batches and executes them.
    ///
    /// Reference teams are prepended to every batch (minus the batch's own
    /// members) so independent calls share calibration anchors. Progress
    /// is published to the cache after every batch and interpolated once
    /// per second while a batch is in flight.
    ///
    /// # Errors
    ///
    /// Only request-fatal errors propagate: token budget exceeded in any
    /// batch, or caller cancellation. Ordinary batch failures are recorded
    /// in the report.
    pub async fn run(
        &self,
        cache_key: &str,
        profile: &RequestProfile,
        teams: &[CondensedTeam],
        batch_size: usize,
        reference_count: usize,
        reference_selection: ReferenceSelection,
        cancel: &CancellationToken,
    ) -> Result<BatchRunReport, PicklistError> {
        let batch_size = batch_size.max(1);
        let total_batches = teams.chunks(batch_size).len();
        let references = select_reference_teams(teams, reference_count, reference_selection);
        let nicknames: Arc<HashMap<u32, String>> = Arc::new(
            teams
                .iter()
                .map(|t| (t.team_number, t.nickname.clone()))
                .collect(),
        );

        debug!(
            total_batches,
            batch_size,
            references = references.len(),
            "starting batched execution"
        );

        let state = Arc::new(Mutex::new(ProgressState {
            progress: BatchProgress::new(cache_key, total_batches),
            in_flight: HashMap::new(),
            merged: Vec::new(),
        }));
        self.publish_progress(cache_key, &state, &nicknames);

        let ticker_done = CancellationToken::new();
        let ticker = self.spawn_ticker(cache_key, &state, &nicknames, &ticker_done);

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_batches));
        let mut tasks: JoinSet<(usize, Result<(Vec<ParsedEntry>, TokenUsage), PicklistError>)> =
            JoinSet::new();

        for (batch_idx, slice) in teams.chunks(batch_size).enumerate() {
            let mut batch_teams: Vec<CondensedTeam> = references
                .iter()
                .filter(|r| !slice.iter().any(|t| t.team_number == r.team_number))
                .cloned()
                .collect();
            batch_teams.extend(slice.iter().cloned());

            let executor = Arc::clone(&self.executor);
            let parser = Arc::clone(&self.parser);
            let prompts = Arc::clone(&self.prompts);
            let counter = Arc::clone(&self.counter);
            let cache = Arc::clone(&self.cache);
            let nicknames = Arc::clone(&nicknames);
            let state = Arc::clone(&state);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let profile = profile.clone();
            let key = cache_key.to_string();
            let timeout = self.config.per_batch_timeout;
            let format = self.format();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (batch_idx, Err(PicklistError::Cancelled)),
                };
                if cancel.is_cancelled() {
                    return (batch_idx, Err(PicklistError::Cancelled));
                }

                lock_state(&state).in_flight.insert(batch_idx, Instant::now());

                let bundle =
                    build_ranking_prompt(&prompts, &profile.context(), &batch_teams, format);
                let result = tokio::time::timeout(
                    timeout,
                    executor.execute(&bundle, counter.as_ref(), &cancel),
                )
                .await;

                let outcome = match result {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        let mut guard = lock_state(&state);
                        guard.in_flight.remove(&batch_idx);
                        guard
                            .progress
                            .events
                            .push(format!("batch {batch_idx} failed: {e}"));
                        return (batch_idx, Err(e));
                    }
                    Err(_) => {
                        let e = PicklistError::BatchTimeout {
                            batch: batch_idx,
                            seconds: timeout.as_secs(),
                        };
                        let mut guard = lock_state(&state);
                        guard.in_flight.remove(&batch_idx);
                        guard
                            .progress
                            .events
                            .push(format!("batch {batch_idx} failed: {e}"));
                        return (batch_idx, Err(e));
                    }
                };

                let (entries, layer) =
                    parser.parse(&outcome.content, outcome.json.as_ref(), Some(&bundle.index_map));

                {
                    let mut guard = lock_state(&state);
                    guard.in_flight.remove(&batch_idx);
                    guard.progress.current_batch += 1;
                    guard.progress.events.push(format!(
                        "batch {batch_idx}: {} entries via {layer} in {:.1}s ({} retries)",
                        entries.len(),
                        outcome.elapsed.as_secs_f64(),
                        outcome.retries,
                    ));
                    guard.merged.extend(entries.iter().cloned());
                }
                publish_snapshot(&cache, &key, &state, &nicknames);

                (batch_idx, Ok((entries, outcome.usage)))
            });
        }

        let mut all_entries: Vec<ParsedEntry> = Vec::new();
        let mut failures: Vec<(usize, PicklistError)> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut batches_processed = 0_usize;
        let mut fatal: Option<PicklistError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok((entries, batch_usage)))) => {
                    batches_processed += 1;
                    usage = usage.add(batch_usage);
                    all_entries.extend(entries);
                }
                Ok((batch_idx, Err(e))) => {
                    if e.is_fatal() && fatal.is_none() {
                        // Budget overruns and cancellation kill the whole
                        // request; stop dispatching further batches.
                        cancel.cancel();
                        fatal = Some(e);
                    } else {
                        warn!(batch = batch_idx, error = %e, "batch failed");
                        failures.push((batch_idx, e));
                    }
                }
                Err(join_err) => {
                    warn!(error = %join_err, "batch task join failed");
                    failures.push((
                        usize::MAX,
                        PicklistError::ApiRequest {
                            message: format!("batch task join failed: {join_err}"),
                            status: None,
                        },
                    ));
                }
            }
        }

        ticker_done.cancel();
        ticker.abort();

        if let Some(e) = fatal {
            return Err(e);
        }

        failures.sort_by_key(|(idx, _)| *idx);

        let valid: HashSet<u32> = teams.iter().map(|t| t.team_number).collect();
        let entries = merge_entries(all_entries, &valid);

        Ok(BatchRunReport {
            entries,
            batches_processed,
            total_batches,
            failures,
            usage,
        })
    }

    /// Runs the follow-up pass over teams missing from the merged output.
    ///
    /// At most one pass: failures here are logged and the remaining gap is
    /// filled with fallback entries by the caller. Large omitted sets are
    /// chunked, but never recurse into another omission pass.
    pub async fn rerank_omitted(
        &self,
        profile: &RequestProfile,
        ranked: &[RankedEntry],
        omitted: &[CondensedTeam],
        cancel: &CancellationToken,
    ) -> (Vec<ParsedEntry>, TokenUsage) {
        let mut recovered: Vec<ParsedEntry> = Vec::new();
        let mut usage = TokenUsage::default();

        for chunk in omitted.chunks(self.config.default_batch_size.max(1)) {
            let bundle = build_omission_prompt(&self.prompts, &profile.context(), ranked, chunk);
            let result = tokio::time::timeout(
                self.config.per_batch_timeout,
                self.executor
                    .execute(&bundle, self.counter.as_ref(), cancel),
            )
            .await;

            match result {
                Ok(Ok(outcome)) => {
                    let (entries, layer) = self.parser.parse(
                        &outcome.content,
                        outcome.json.as_ref(),
                        Some(&bundle.index_map),
                    );
                    debug!(
                        recovered = entries.len(),
                        layer, "omission pass chunk complete"
                    );
                    usage = usage.add(outcome.usage);
                    recovered.extend(entries);
                }
                Ok(Err(PicklistError::Cancelled)) => break,
                Ok(Err(e)) => {
                    warn!(error = %e, "omission pass chunk failed");
                }
                Err(_) => {
                    warn!("omission pass chunk timed out");
                }
            }
        }

        (recovered, usage)
    }

    fn publish_progress(
        &self,
        key: &str,
        state: &Arc<Mutex<ProgressState>>,
        nicknames: &Arc<HashMap<u32, String>>,
    ) {
        publish_snapshot(&self.cache, key, state, nicknames);
    }

    fn spawn_ticker(
        &self,
        key: &str,
        state: &Arc<Mutex<ProgressState>>,
        nicknames: &Arc<HashMap<u32, String>>,
        done: &CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let state = Arc::clone(state);
        let nicknames = Arc::clone(nicknames);
        let done = done.clone();
        let key = key.to_string();
        let expected = self.config.per_batch_timeout;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = done.cancelled() => break,
                    () = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
                        {
                            let mut guard = lock_state(&state);
                            let interp: f64 = guard
                                .in_flight
                                .values()
                                .map(|started| {
                                    (started.elapsed().as_secs_f64()
                                        / expected.as_secs_f64().max(f64::EPSILON))
                                    .min(INTERPOLATION_CAP)
                                })
                                .sum();
                            let total = guard.progress.total_batches.max(1) as f64;
                            let completed = guard.progress.current_batch as f64;
                            guard.progress.percentage =
                                (((completed + interp) / total) * 100.0).min(100.0);
                        }
                        publish_snapshot(&cache, &key, &state, &nicknames);
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("max_parallel_batches", &self.config.max_parallel_batches)
            .field("per_batch_timeout", &self.config.per_batch_timeout)
            .finish()
    }
}

fn lock_state(state: &Arc<Mutex<ProgressState>>) -> MutexGuard<'_, ProgressState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishes the current progress snapshot to the cache.
fn publish_snapshot(
    cache: &Arc<dyn PicklistCache>,
    key: &str,
    state: &Arc<Mutex<ProgressState>>,
    nicknames: &Arc<HashMap<u32, String>>,
) {
    let snapshot = {
        let mut guard = lock_state(state);
        let total = guard.progress.total_batches.max(1) as f64;
        let completed = guard.progress.current_batch as f64;
        // Completed-batch floor; the ticker layers interpolation on top.
        guard.progress.percentage = guard
            .progress
            .percentage
            .max((completed / total) * 100.0)
            .min(100.0);
        guard.progress.complete = guard.progress.current_batch >= guard.progress.total_batches;

        let valid: HashSet<u32> = guard.merged.iter().map(|e| e.team_number).collect();
        let merged = merge_entries(guard.merged.clone(), &valid);
        guard.progress.partial = join_nicknames(merged, nicknames);
        guard.progress.clone()
    };
    cache.publish(key, CacheEntry::Progress(snapshot));
}

/// Selects reference teams from the globally ranked (weighted-score
/// descending) team list.
///
/// `TopMiddleBottom` spreads indices uniformly across the order: first,
/// median, last for the default count of three. `Top` takes the leading
/// entries. Duplicate indices collapse for tiny datasets.
#[must_use]
pub fn select_reference_teams(
    teams: &[CondensedTeam],
    count: usize,
    selection: ReferenceSelection,
) -> Vec<CondensedTeam> {
    if teams.is_empty() || count == 0 {
        return Vec::new();
    }
    let count = count.min(teams.len());

    match selection {
        ReferenceSelection::Top => teams[..count].to_vec(),
        ReferenceSelection::TopMiddleBottom => {
            let mut indices: Vec<usize> = if count == 1 {
                vec![0]
            } else {
                (0..count)
                    .map(|i| i * (teams.len() - 1) / (count - 1))
                    .collect()
            };
            indices.dedup();
            indices.into_iter().map(|i| teams[i].clone()).collect()
        }
    }
}

/// Merges entries across batches: unknown teams dropped, duplicates
/// resolved to the highest score, output sorted by score descending with
/// team number as the tie-break.
#[must_use]
pub fn merge_entries(
    entries: impl IntoIterator<Item = ParsedEntry>,
    valid: &HashSet<u32>,
) -> Vec<ParsedEntry> {
    let mut best: HashMap<u32, ParsedEntry> = HashMap::new();
    for entry in entries {
        if !valid.contains(&entry.team_number) {
            warn!(
                team_number = entry.team_number,
                "dropping entry for team outside the request"
            );
            continue;
        }
        match best.entry(entry.team_number) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if entry.score > slot.get().score {
                    slot.insert(entry);
                }
            }
        }
    }

    let mut merged: Vec<ParsedEntry> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.team_number.cmp(&b.team_number))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picklist::priority::{Priority, normalize_priorities};
    use crate::picklist::types::PickPosition;
    use crate::provider::{ChatRequest, ChatResponse, LlmProvider};
    use async_trait::async_trait;
    use regex::Regex;
    use std::collections::BTreeMap;

    fn team(number: u32, score: f64) -> CondensedTeam {
        CondensedTeam {
            team_number: number,
            nickname: format!("Team {number}"),
            metrics: BTreeMap::new(),
            notes: None,
            weighted_score: score,
        }
    }

    fn entry(team_number: u32, score: f64) -> ParsedEntry {
        ParsedEntry {
            team_number,
            score,
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_reference_top_middle_bottom() {
        let teams: Vec<CondensedTeam> = (0..9).map(|i| team(100 + i, 1.0 - f64::from(i) / 10.0)).collect();
        let refs = select_reference_teams(&teams, 3, ReferenceSelection::TopMiddleBottom);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].team_number, 100);
        assert_eq!(refs[1].team_number, 104);
        assert_eq!(refs[2].team_number, 108);
    }

    #[test]
    fn test_reference_top() {
        let teams: Vec<CondensedTeam> = (0..9).map(|i| team(100 + i, 0.5)).collect();
        let refs = select_reference_teams(&teams, 3, ReferenceSelection::Top);
        let numbers: Vec<u32> = refs.iter().map(|t| t.team_number).collect();
        assert_eq!(numbers, vec![100, 101, 102]);
    }

    #[test]
    fn test_reference_tiny_dataset_collapses() {
        let teams = vec![team(1, 0.9), team(2, 0.8)];
        let refs = select_reference_teams(&teams, 3, ReferenceSelection::TopMiddleBottom);
        let numbers: Vec<u32> = refs.iter().map(|t| t.team_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        assert!(select_reference_teams(&[], 3, ReferenceSelection::Top).is_empty());
        assert!(select_reference_teams(&teams, 0, ReferenceSelection::Top).is_empty());
    }

    #[test]
    fn test_merge_dedupes_keeping_highest_score() {
        let valid: HashSet<u32> = [254, 1678].into_iter().collect();
        let merged = merge_entries(
            vec![entry(254, 7.0), entry(1678, 8.0), entry(254, 9.0)],
            &valid,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].team_number, 254);
        assert!((merged[0].score - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_drops_unknown_teams() {
        let valid: HashSet<u32> = [254].into_iter().collect();
        let merged = merge_entries(vec![entry(254, 7.0), entry(4242, 9.0)], &valid);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].team_number, 254);
    }

    #[test]
    fn test_merge_sorted_descending_with_stable_ties() {
        let valid: HashSet<u32> = [1, 2, 3].into_iter().collect();
        let merged = merge_entries(vec![entry(3, 5.0), entry(1, 5.0), entry(2, 9.0)], &valid);
        let numbers: Vec<u32> = merged.iter().map(|e| e.team_number).collect();
        assert_eq!(numbers, vec![2, 1, 3]);
    }

    /// Provider that reads the index-map count out of the user prompt and
    /// ranks every index in order.
    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, PicklistError> {
            let user = request
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let count = Regex::new(r#"<index_map count="(\d+)">"#)
                .ok()
                .and_then(|re| re.captures(&user))
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(0);
            let triples: Vec<String> = (1..=count)
                .map(|i| format!(r#"[{i},{score},"ok"]"#, score = count + 1 - i))
                .collect();
            Ok(ChatResponse {
                content: format!(r#"{{"p":[{}],"s":"ok"}}"#, triples.join(",")),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 10,
                    total_tokens: 20,
                },
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    struct CharCounter;

    impl TokenCounter for CharCounter {
        fn count(&self, text: &str) -> usize {
            text.len() / 4
        }
    }

    fn coordinator(cache: Arc<dyn PicklistCache>) -> BatchCoordinator {
        let config = GeneratorConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        BatchCoordinator::new(
            Arc::new(LlmExecutor::new(Arc::new(EchoProvider), &config)),
            Arc::new(ResponseParser::new()),
            Arc::new(PromptSet::defaults()),
            cache,
            Arc::new(CharCounter),
            config,
        )
    }

    fn profile() -> RequestProfile {
        RequestProfile {
            your_team_number: 1234,
            your_team: None,
            pick_position: PickPosition::First,
            priorities: normalize_priorities(&[Priority {
                id: "auto_points".to_string(),
                weight: 1.0,
                reason: None,
            }])
            .unwrap_or_default(),
            game_context: None,
        }
    }

    #[tokio::test]
    async fn test_run_covers_every_team() {
        let cache: Arc<dyn PicklistCache> = Arc::new(crate::picklist::cache::MemoryCache::new(
            std::time::Duration::from_secs(60),
        ));
        let teams: Vec<CondensedTeam> =
            (0..45).map(|i| team(100 + i, 1.0 - f64::from(i) / 100.0)).collect();

        let report = coordinator(Arc::clone(&cache))
            .run(
                "testkey",
                &profile(),
                &teams,
                20,
                3,
                ReferenceSelection::TopMiddleBottom,
                &CancellationToken::new(),
            )
            .await;

        assert!(report.is_ok());
        let report = match report {
            Ok(r) => r,
            Err(_) => return,
        };
        assert_eq!(report.total_batches, 3);
        assert_eq!(report.batches_processed, 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.entries.len(), 45);
        // Monotone in score.
        for pair in report.entries.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Progress was published along the way.
        let status = crate::picklist::cache::status_report(cache.lookup("testkey").as_ref());
        assert_eq!(status.status, "in_progress");
        assert_eq!(status.total_batches, 3);
        assert_eq!(status.current_batch, 3);
    }

    #[tokio::test]
    async fn test_rerank_omitted_single_chunk() {
        let cache: Arc<dyn PicklistCache> = Arc::new(crate::picklist::cache::MemoryCache::new(
            std::time::Duration::from_secs(60),
        ));
        let omitted = vec![team(7, 0.2), team(8, 0.1)];
        let ranked = vec![RankedEntry {
            team_number: 1,
            nickname: "One".to_string(),
            score: 9.0,
            reasoning: "top".to_string(),
            is_fallback: false,
        }];

        let (recovered, usage) = coordinator(cache)
            .rerank_omitted(&profile(), &ranked, &omitted, &CancellationToken::new())
            .await;

        assert_eq!(recovered.len(), 2);
        assert!(usage.total_tokens > 0);
        let numbers: HashSet<u32> = recovered.iter().map(|e| e.team_number).collect();
        assert!(numbers.contains(&7) && numbers.contains(&8));
    }
}
