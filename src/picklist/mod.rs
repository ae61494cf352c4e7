//! LLM-driven picklist generation core.
//!
//! Turns a non-deterministic, token-limited, rate-limited model into a
//! reliable ranking engine over scouting datasets that do not fit in a
//! single round-trip.
//!
//! # Architecture
//!
//! ```text
//! PicklistRequest → PicklistGenerator
//!   ├── fingerprint → cache lookup (hit? return)
//!   ├── normalize priorities → condense & score teams
//!   ├── plan: single call or batches
//!   ├── Single → compile prompt → execute → parse
//!   ├── Batched → BatchCoordinator
//!   │     └── per batch: references + slice → prompt → execute → parse
//!   │         (progress published to the cache once per second)
//!   ├── merge → omission pass → fallback entries
//!   └── publish tagged RankingResult
//! ```
//!
//! Every batch prompt carries its own index map, so the parser can never
//! attribute one batch's output to another batch's team set.

pub mod budget;
pub mod cache;
pub mod condense;
pub mod config;
pub mod coordinator;
pub mod dataset;
pub mod executor;
pub mod generator;
pub mod index_map;
pub mod parser;
pub mod planner;
pub mod priority;
pub mod prompt;
pub mod types;

// Re-export key types
pub use budget::{TiktokenCounter, TokenBudget, TokenCounter};
pub use cache::{CacheEntry, MemoryCache, PicklistCache, fingerprint, status_report};
pub use condense::{CondensedTeam, condense_teams};
pub use config::GeneratorConfig;
pub use coordinator::{BatchCoordinator, BatchRunReport, RequestProfile};
pub use dataset::{DatasetSource, StaticDataset};
pub use executor::{LlmExecutor, LlmOutcome};
pub use generator::PicklistGenerator;
pub use index_map::IndexMap;
pub use parser::{ParsedEntry, ResponseParser};
pub use planner::{ExecutionPlan, Strategy, plan_request};
pub use priority::{NormalizedPriority, Priority, normalize_priorities};
pub use prompt::{PromptBundle, PromptFormat, PromptSet};
pub use types::{
    BatchProgress, ErrorInfo, MetricValue, PickPosition, PicklistRequest, RankedEntry,
    RankingResult, ReferenceSelection, ResultStatus, StatusReport, TeamRecord,
};
