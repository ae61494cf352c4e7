//! Deterministic request fingerprints and the result cache.
//!
//! The fingerprint is a short hex digest over the canonical serialization
//! of every semantically significant input, so identical requests hit the
//! same cache slot across process restarts. The cache itself sits behind a
//! small trait so deployments can swap the in-memory store for a
//! distributed one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::priority::NormalizedPriority;
use super::types::{BatchProgress, PicklistRequest, RankingResult, ResultStatus, StatusReport};

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// Canonical form hashed into the fingerprint. Field order is the wire
/// order; changing it changes every key.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    your_team_number: u32,
    pick_position: &'a str,
    priorities: Vec<CanonicalPriority<'a>>,
    exclude_teams: Vec<u32>,
    team_numbers: Option<Vec<u32>>,
    use_batching: Option<bool>,
}

#[derive(Serialize)]
struct CanonicalPriority<'a> {
    id: &'a str,
    weight: f64,
}

fn sorted_dedup(numbers: &[u32]) -> Vec<u32> {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Computes the cache key for a request.
///
/// Priorities are canonicalized: sorted by id with normalized weights
/// rounded to four decimals, so caller-side reordering or rescaling of the
/// same weights lands on the same key.
#[must_use]
pub fn fingerprint(request: &PicklistRequest, priorities: &[NormalizedPriority]) -> String {
    let mut canonical_priorities: Vec<CanonicalPriority<'_>> = priorities
        .iter()
        .map(|p| CanonicalPriority {
            id: &p.id,
            weight: (p.weight * 10_000.0).round() / 10_000.0,
        })
        .collect();
    canonical_priorities.sort_by(|a, b| a.id.cmp(b.id));

    let canonical = CanonicalRequest {
        your_team_number: request.your_team_number,
        pick_position: request.pick_position.as_str(),
        priorities: canonical_priorities,
        exclude_teams: sorted_dedup(&request.exclude_teams),
        team_numbers: request.team_numbers.as_deref().map(sorted_dedup),
        use_batching: request.use_batching,
    };

    let payload = serde_json::to_string(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// A cache slot's value over the request lifecycle.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Reserved by the first writer; no progress yet.
    InFlight,
    /// Batched execution underway.
    Progress(BatchProgress),
    /// Terminal result.
    Ready(RankingResult),
}

/// Storage seam for the result cache.
///
/// The cache is the only cross-request shared state in the core.
pub trait PicklistCache: Send + Sync {
    /// Returns the live entry for a key, if any.
    fn lookup(&self, key: &str) -> Option<CacheEntry>;

    /// Atomically inserts an in-flight marker. Returns `true` iff the
    /// caller is the first writer for this key.
    fn reserve(&self, key: &str) -> bool;

    /// Overwrites the entry with progress or a terminal result.
    fn publish(&self, key: &str, entry: CacheEntry);

    /// Drops the entry, clearing in-flight markers on terminal failure.
    fn remove(&self, key: &str);
}

struct Stored {
    entry: CacheEntry,
    inserted: Instant,
}

/// Process-local TTL cache guarded by a single mutex.
pub struct MemoryCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, Stored>>,
}

impl MemoryCache {
    /// Creates a cache whose entries expire `ttl` after their last write.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Stored>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, stored: &Stored) -> bool {
        stored.inserted.elapsed() > self.ttl
    }
}

impl PicklistCache for MemoryCache {
    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let mut inner = self.lock();
        match inner.get(key) {
            Some(stored) if self.is_expired(stored) => {
                inner.remove(key);
                None
            }
            Some(stored) => Some(stored.entry.clone()),
            None => None,
        }
    }

    fn reserve(&self, key: &str) -> bool {
        let mut inner = self.lock();
        if let Some(stored) = inner.get(key)
            && !self.is_expired(stored)
        {
            return false;
        }
        inner.insert(
            key.to_string(),
            Stored {
                entry: CacheEntry::InFlight,
                inserted: Instant::now(),
            },
        );
        true
    }

    fn publish(&self, key: &str, entry: CacheEntry) {
        self.lock().insert(
            key.to_string(),
            Stored {
                entry,
                inserted: Instant::now(),
            },
        );
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.lock().len())
            .finish()
    }
}

/// Projects a cache entry into the status-endpoint payload.
#[must_use]
pub fn status_report(entry: Option<&CacheEntry>) -> StatusReport {
    match entry {
        None => StatusReport {
            status: "unknown".to_string(),
            percentage: 0.0,
            current_batch: 0,
            total_batches: 0,
            partial_picklist: None,
        },
        Some(CacheEntry::InFlight) => StatusReport {
            status: "queued".to_string(),
            percentage: 0.0,
            current_batch: 0,
            total_batches: 0,
            partial_picklist: None,
        },
        Some(CacheEntry::Progress(progress)) => StatusReport {
            status: "in_progress".to_string(),
            percentage: progress.percentage,
            current_batch: progress.current_batch,
            total_batches: progress.total_batches,
            partial_picklist: if progress.partial.is_empty() {
                None
            } else {
                Some(progress.partial.clone())
            },
        },
        Some(CacheEntry::Ready(result)) => StatusReport {
            status: if result.status == ResultStatus::Error {
                "failed".to_string()
            } else {
                "complete".to_string()
            },
            percentage: 100.0,
            current_batch: result.total_batches.unwrap_or(0),
            total_batches: result.total_batches.unwrap_or(0),
            partial_picklist: if result.picklist.is_empty() {
                None
            } else {
                Some(result.picklist.clone())
            },
        },
    }
}
