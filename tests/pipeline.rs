//! End-to-end pipeline scenarios over a scripted stub provider.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use picklist_rs::error::{ErrorKind, PicklistError};
use picklist_rs::picklist::{
    GeneratorConfig, MemoryCache, MetricValue, PickPosition, PicklistGenerator, PicklistRequest,
    Priority, ResultStatus, StaticDataset, TeamRecord, TokenCounter,
};
use picklist_rs::provider::{ChatRequest, ChatResponse, LlmProvider, TokenUsage};

/// One scripted model behavior.
#[derive(Clone)]
enum Reply {
    /// Rank every index in the prompt's index map, best first.
    RankAll,
    /// Rank everything except the given 1-based indices.
    Drop(Vec<usize>),
    /// Self-report overflow.
    Overflow,
    /// Fail with a rate-limit error.
    RateLimited,
    /// Malformed JSON whose free text still contains bracket triples.
    FreeText,
    /// Never answer (the per-batch timeout must cut this off).
    Hang,
}

/// Stub provider: consumes an ordered script first, then content rules,
/// then the default reply.
struct TestProvider {
    script: Mutex<VecDeque<Reply>>,
    rules: Vec<(String, Reply)>,
    default: Reply,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl TestProvider {
    fn new(default: Reply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            default,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn with_script(mut self, script: Vec<Reply>) -> Self {
        self.script = Mutex::new(script.into_iter().collect());
        self
    }

    fn with_rule(mut self, needle: &str, reply: Reply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn index_count(user: &str) -> usize {
        Regex::new(r#"<index_map count="(\d+)">"#)
            .ok()
            .and_then(|re| re.captures(user))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }

    fn compact_body(count: usize, drop: &[usize]) -> String {
        let triples: Vec<String> = (1..=count)
            .filter(|i| !drop.contains(i))
            .map(|i| format!(r#"[{i},{score},"ranked"]"#, score = count + 1 - i))
            .collect();
        format!(r#"{{"p":[{}],"s":"ok"}}"#, triples.join(","))
    }
}

#[async_trait]
impl LlmProvider for TestProvider {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, PicklistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(user.clone());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let reply = scripted.unwrap_or_else(|| {
            self.rules
                .iter()
                .find(|(needle, _)| user.contains(needle))
                .map_or_else(|| self.default.clone(), |(_, reply)| reply.clone())
        });

        let count = Self::index_count(&user);
        let ok = |content: String| {
            Ok(ChatResponse {
                content,
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 40,
                    total_tokens: 140,
                },
                finish_reason: Some("stop".to_string()),
            })
        };

        match reply {
            Reply::RankAll => ok(Self::compact_body(count, &[])),
            Reply::Drop(skip) => ok(Self::compact_body(count, &skip)),
            Reply::Overflow => ok(r#"{"s":"overflow"}"#.to_string()),
            Reply::RateLimited => Err(PicklistError::RateLimited {
                message: "429 rate limit".to_string(),
            }),
            Reply::FreeText => {
                let triples: Vec<String> = (1..=count)
                    .map(|i| format!(r#"[{i}, {score}.5, "pick {i}"]"#, score = count + 1 - i))
                    .collect();
                ok(format!("Sure! Here is my ranking: {}", triples.join(" then ")))
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                ok(Self::compact_body(count, &[]))
            }
        }
    }
}

/// Four characters per token keeps prompts far under the default budget.
struct CharCounter;

impl TokenCounter for CharCounter {
    fn count(&self, text: &str) -> usize {
        text.len() / 4
    }
}

fn dataset(count: u32) -> StaticDataset {
    let records: Vec<TeamRecord> = (0..count)
        .map(|i| TeamRecord {
            team_number: 100 + i,
            nickname: format!("Team {}", 100 + i),
            metrics: [
                (
                    "auto_points".to_string(),
                    MetricValue::Scalar(f64::from(count - i)),
                ),
                (
                    "teleop_points".to_string(),
                    MetricValue::Series(vec![30.0, 35.0, 32.0]),
                ),
            ]
            .into_iter()
            .collect(),
            statbotics: [("epa".to_string(), f64::from(count - i) * 1.5)]
                .into_iter()
                .collect(),
            superscouting: vec!["reliable partner".to_string()],
            extra: HashMap::new(),
        })
        .collect();
    StaticDataset::new(records).with_context("2025 game rewards fast cycle times")
}

fn request(priorities: &[(&str, f64)]) -> PicklistRequest {
    PicklistRequest {
        your_team_number: 1234,
        pick_position: PickPosition::First,
        priorities: priorities
            .iter()
            .map(|(id, weight)| Priority {
                id: (*id).to_string(),
                weight: *weight,
                reason: None,
            })
            .collect(),
        exclude_teams: Vec::new(),
        team_numbers: None,
        use_batching: None,
        batch_size: None,
        reference_teams_count: 3,
        reference_selection: Default::default(),
    }
}

fn generator_with(provider: Arc<TestProvider>, config: GeneratorConfig) -> PicklistGenerator {
    PicklistGenerator::new(
        provider,
        Arc::new(MemoryCache::new(config.cache_ttl)),
        Arc::new(CharCounter),
        config,
    )
}

fn config() -> GeneratorConfig {
    GeneratorConfig::builder()
        .api_key("test")
        .build()
        .unwrap_or_else(|_| unreachable!())
}

fn assert_monotone(result: &picklist_rs::picklist::RankingResult) {
    for pair in result.picklist.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "picklist not monotone: {} ({}) before {} ({})",
            pair[0].team_number,
            pair[0].score,
            pair[1].team_number,
            pair[1].score
        );
    }
}

fn assert_bijection(result: &picklist_rs::picklist::RankingResult, expected: &HashSet<u32>) {
    let produced: HashSet<u32> = result.picklist.iter().map(|e| e.team_number).collect();
    assert_eq!(produced.len(), result.picklist.len(), "duplicate teams");
    assert_eq!(&produced, expected, "picklist does not cover the team set");
}

/// Scenario 1: 55 teams, auto-batching, no failures.
#[tokio::test]
async fn fifty_five_teams_auto_batching_success() {
    let provider = Arc::new(TestProvider::new(Reply::RankAll));
    let generator = generator_with(Arc::clone(&provider), config());

    let result = generator
        .generate(
            &dataset(55),
            &request(&[("auto_points", 2.0), ("teleop_points", 1.5), ("epa", 1.0)]),
        )
        .await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.picklist.len(), 55);
    assert_bijection(&result, &(100..155).collect());
    assert_monotone(&result);
    assert!(result.picklist.iter().all(|e| !e.is_fallback));
    assert_eq!(result.batches_processed, Some(3));
    assert_eq!(result.total_batches, Some(3));
    assert_eq!(provider.calls(), 3);
    assert!(result.total_tokens > 0);
}

/// Scenario 2: 25 teams, single-processing forced, model drops two teams;
/// the omission pass recovers them with a dedicated call.
#[tokio::test]
async fn single_mode_omission_pass_recovers_dropped_teams() {
    let provider = Arc::new(
        TestProvider::new(Reply::RankAll)
            .with_rule(r#"<index_map count="25">"#, Reply::Drop(vec![3, 7])),
    );
    let generator = generator_with(Arc::clone(&provider), config());

    let mut req = request(&[("auto_points", 1.0)]);
    req.use_batching = Some(false);

    let result = generator.generate(&dataset(25), &req).await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.picklist.len(), 25);
    assert_bijection(&result, &(100..125).collect());
    assert_monotone(&result);
    // The recovery call ranked the two dropped teams, so nothing is a
    // synthetic fallback.
    assert!(result.picklist.iter().all(|e| !e.is_fallback));

    // Exactly one follow-up call, scoped to the two omitted teams.
    assert_eq!(provider.calls(), 2);
    let prompts = provider.prompts();
    assert!(prompts[1].contains(r#"<index_map count="2">"#));
    assert!(prompts[1].contains("<ranked_context>"));
}

/// Scenario 3: first call reports overflow; the request fails with
/// `data_overflow` and the in-flight cache marker is cleared.
#[tokio::test]
async fn overflow_fails_without_cache_pollution() {
    let provider = Arc::new(TestProvider::new(Reply::Overflow));
    let generator = generator_with(Arc::clone(&provider), config());

    let result = generator
        .generate(&dataset(20), &request(&[("auto_points", 1.0)]))
        .await;

    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(
        result.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::DataOverflow)
    );
    assert!(result.picklist.is_empty());
    // In-flight marker cleared: the key reports unknown, not queued.
    assert_eq!(generator.status(&result.cache_key).status, "unknown");
}

/// Scenario 4: rate-limit on the first two attempts, success on the third,
/// with 2s + 4s backoff sleeps.
#[tokio::test(start_paused = true)]
async fn rate_limit_retries_then_succeeds() {
    let provider = Arc::new(TestProvider::new(Reply::RankAll).with_script(vec![
        Reply::RateLimited,
        Reply::RateLimited,
        Reply::RankAll,
    ]));
    let generator = generator_with(Arc::clone(&provider), config());

    let mut req = request(&[("auto_points", 1.0)]);
    req.use_batching = Some(false);

    let start = tokio::time::Instant::now();
    let result = generator.generate(&dataset(30), &req).await;
    let waited = start.elapsed();

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.picklist.len(), 30);
    assert_eq!(provider.calls(), 3);
    assert_eq!(waited, Duration::from_secs(6));
}

/// Scenario 5: malformed JSON whose free text still carries bracket
/// triples; the regex salvage layer recovers all ten teams.
#[tokio::test]
async fn regex_salvage_recovers_free_text_response() {
    let provider = Arc::new(TestProvider::new(Reply::FreeText));
    let generator = generator_with(Arc::clone(&provider), config());

    let result = generator
        .generate(&dataset(10), &request(&[("auto_points", 1.0)]))
        .await;

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.picklist.len(), 10);
    assert_bijection(&result, &(100..110).collect());
    assert_monotone(&result);
    assert_eq!(provider.calls(), 1);
}

/// Scenario 6: 75 teams, one batch hangs past the per-batch timeout; the
/// result is partial, with fallback entries covering the failed batch.
#[tokio::test]
async fn batch_timeout_yields_partial_result_with_fallbacks() {
    // Team 125 sits in the second batch of the score-descending order and
    // is not a reference anchor; any prompt containing it hangs.
    let provider = Arc::new(
        TestProvider::new(Reply::RankAll).with_rule(r#""team":125,"#, Reply::Hang),
    );
    let cfg = GeneratorConfig::builder()
        .api_key("test")
        .per_batch_timeout(Duration::from_millis(200))
        .build()
        .unwrap_or_else(|_| unreachable!());
    let generator = generator_with(Arc::clone(&provider), cfg);

    let result = generator
        .generate(&dataset(75), &request(&[("auto_points", 1.0)]))
        .await;

    assert_eq!(result.status, ResultStatus::Partial);
    assert_eq!(result.total_batches, Some(4));
    let processed = result.batches_processed.unwrap_or(0);
    assert!(processed < 4 && processed >= 1);
    assert_eq!(
        result.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::PartialFailure)
    );
    assert_bijection(&result, &(100..175).collect());
    assert_monotone(&result);
    // Teams from the failed batch came back as synthetic fallbacks (the
    // omission retry hangs on team 125 too).
    assert!(result.picklist.iter().any(|e| e.is_fallback));
    let fallbacks: HashSet<u32> = result
        .picklist
        .iter()
        .filter(|e| e.is_fallback)
        .map(|e| e.team_number)
        .collect();
    assert!(fallbacks.contains(&125));
    // Every fallback scores below every model-emitted entry.
    let model_min = result
        .picklist
        .iter()
        .filter(|e| !e.is_fallback)
        .map(|e| e.score)
        .fold(f64::INFINITY, f64::min);
    assert!(
        result
            .picklist
            .iter()
            .filter(|e| e.is_fallback)
            .all(|e| e.score < model_min)
    );
}

/// Cache idempotence: the second identical request is served from the
/// cache without another model call.
#[tokio::test]
async fn identical_request_served_from_cache() {
    let provider = Arc::new(TestProvider::new(Reply::RankAll));
    let generator = generator_with(Arc::clone(&provider), config());
    let req = request(&[("auto_points", 1.0)]);

    let first = generator.generate(&dataset(10), &req).await;
    let calls_after_first = provider.calls();
    let second = generator.generate(&dataset(10), &req).await;

    assert_eq!(provider.calls(), calls_after_first);
    assert_eq!(first.cache_key, second.cache_key);
    assert_eq!(first.picklist.len(), second.picklist.len());
    for (a, b) in first.picklist.iter().zip(&second.picklist) {
        assert_eq!(a.team_number, b.team_number);
        assert!((a.score - b.score).abs() < f64::EPSILON);
    }
    assert_eq!(generator.status(&first.cache_key).status, "complete");
}

/// Budget guard: an oversized prompt is rejected before any model call.
#[tokio::test]
async fn token_budget_guard_blocks_before_calling() {
    let provider = Arc::new(TestProvider::new(Reply::RankAll));
    let cfg = GeneratorConfig::builder()
        .api_key("test")
        .max_input_tokens(50)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let generator = generator_with(Arc::clone(&provider), cfg);

    let mut req = request(&[("auto_points", 1.0)]);
    req.use_batching = Some(false);
    let result = generator.generate(&dataset(40), &req).await;

    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(
        result.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::TokenBudgetExceeded)
    );
    assert_eq!(provider.calls(), 0);
}

/// Cancellation before work starts yields a tagged `cancelled` result.
#[tokio::test]
async fn pre_cancelled_request_reports_cancelled() {
    let provider = Arc::new(TestProvider::new(Reply::RankAll));
    let generator = generator_with(Arc::clone(&provider), config());

    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    let mut req = request(&[("auto_points", 1.0)]);
    req.use_batching = Some(false);

    let result = generator
        .generate_cancellable(&dataset(10), &req, cancel)
        .await;

    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(
        result.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Cancelled)
    );
    assert_eq!(provider.calls(), 0);
    // Cancelled requests are marked failed in the cache.
    assert_eq!(generator.status(&result.cache_key).status, "failed");
}
