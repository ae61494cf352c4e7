//! Layered recovery of structured rankings from model output.
//!
//! Four layers are tried in order, first success wins: the compact
//! index-triple format, the standard picklist-object format, a regex
//! salvage over the raw text, and finally the empty result (the omission
//! pass fills the gap). Parsers are a chain of strategy objects behind a
//! common [`ParseLayer`] capability.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::index_map::IndexMap;
use super::types::RankedEntry;

/// One ranking entry recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    /// Team number (mapped through the index map where applicable).
    pub team_number: u32,
    /// Model-assigned score.
    pub score: f64,
    /// Model rationale.
    pub reasoning: String,
}

/// A single recovery strategy.
pub trait ParseLayer: Send + Sync {
    /// Layer name for logging.
    fn name(&self) -> &'static str;

    /// Attempts to recover entries. `None` means "layer inapplicable or
    /// nothing recovered"; the chain moves on.
    fn try_parse(
        &self,
        raw: &str,
        json: Option<&Value>,
        map: Option<&IndexMap>,
    ) -> Option<Vec<ParsedEntry>>;
}

/// Parses the compact `{"p":[[i,s,"r"],…],"s":"ok"}` format.
///
/// Indices are mapped through the [`IndexMap`]; unknown or repeated
/// indices are skipped with a log line. This layer never emits a team
/// number absent from the map.
pub struct CompactLayer;

impl ParseLayer for CompactLayer {
    fn name(&self) -> &'static str {
        "compact"
    }

    fn try_parse(
        &self,
        _raw: &str,
        json: Option<&Value>,
        map: Option<&IndexMap>,
    ) -> Option<Vec<ParsedEntry>> {
        let map = map?;
        let triples = json?.get("p")?.as_array()?;

        let mut seen: HashSet<u32> = HashSet::new();
        let mut entries = Vec::with_capacity(triples.len());

        for triple in triples {
            let Some(items) = triple.as_array() else {
                warn!("compact entry is not an array, skipping");
                continue;
            };
            let Some(index) = items.first().and_then(Value::as_u64) else {
                warn!("compact entry has no integer index, skipping");
                continue;
            };
            let index = usize::try_from(index).unwrap_or(usize::MAX);
            let Some(team_number) = map.team_for(index) else {
                warn!(index, "compact entry index not in index map, skipping");
                continue;
            };
            if !seen.insert(team_number) {
                warn!(index, team_number, "duplicate index in compact response, skipping");
                continue;
            }
            let score = items.get(1).and_then(Value::as_f64).unwrap_or(0.0);
            let reasoning = items
                .get(2)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            entries.push(ParsedEntry {
                team_number,
                score,
                reasoning,
            });
        }

        if entries.is_empty() { None } else { Some(entries) }
    }
}

/// Parses the standard `{"picklist":[{team_number,score,reasoning},…]}`
/// format with direct team numbers.
pub struct StandardLayer;

impl ParseLayer for StandardLayer {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn try_parse(
        &self,
        _raw: &str,
        json: Option<&Value>,
        _map: Option<&IndexMap>,
    ) -> Option<Vec<ParsedEntry>> {
        let items = json?.get("picklist")?.as_array()?;

        let mut seen: HashSet<u32> = HashSet::new();
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let Some(team_number) = item
                .get("team_number")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
            else {
                warn!("picklist entry has no team_number, skipping");
                continue;
            };
            if !seen.insert(team_number) {
                warn!(team_number, "duplicate team in standard response, skipping");
                continue;
            }
            let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
            let reasoning = item
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            entries.push(ParsedEntry {
                team_number,
                score,
                reasoning,
            });
        }

        if entries.is_empty() { None } else { Some(entries) }
    }
}

/// Salvages `[int, float, "string"]` triples from free text.
///
/// The integer is interpreted per the active mapping policy: index when
/// an [`IndexMap`] is present, direct team number otherwise. Output is
/// sorted by score descending.
pub struct RegexLayer {
    pattern: Option<Regex>,
}

impl RegexLayer {
    /// Bracket-triple pattern applied to the raw text.
    const PATTERN: &'static str = r#"\[\s*(\d+)\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*"([^"]*)"\s*\]"#;

    /// Creates the layer, compiling its pattern.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(Self::PATTERN).ok(),
        }
    }
}

impl Default for RegexLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseLayer for RegexLayer {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn try_parse(
        &self,
        raw: &str,
        _json: Option<&Value>,
        map: Option<&IndexMap>,
    ) -> Option<Vec<ParsedEntry>> {
        let pattern = self.pattern.as_ref()?;

        let mut seen: HashSet<u32> = HashSet::new();
        let mut entries = Vec::new();

        for captures in pattern.captures_iter(raw) {
            let Some(number) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok())
            else {
                continue;
            };
            let team_number = match map {
                Some(map) => {
                    let Some(team) = map.team_for(number) else {
                        warn!(index = number, "salvaged index not in index map, skipping");
                        continue;
                    };
                    team
                }
                None => {
                    let Ok(team) = u32::try_from(number) else {
                        continue;
                    };
                    team
                }
            };
            if !seen.insert(team_number) {
                continue;
            }
            let score = captures
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0);
            let reasoning = captures.get(3).map_or(String::new(), |m| m.as_str().to_string());
            entries.push(ParsedEntry {
                team_number,
                score,
                reasoning,
            });
        }

        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        Some(entries)
    }
}

/// The full recovery chain.
pub struct ResponseParser {
    layers: Vec<Box<dyn ParseLayer>>,
}

impl ResponseParser {
    /// Creates the default chain: compact → standard → regex.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: vec![
                Box::new(CompactLayer),
                Box::new(StandardLayer),
                Box::new(RegexLayer::new()),
            ],
        }
    }

    /// Runs the chain; the first layer to recover anything wins.
    ///
    /// Returns the recovered entries (possibly empty) and the name of the
    /// winning layer (`"empty"` when every layer declined).
    #[must_use]
    pub fn parse(
        &self,
        raw: &str,
        json: Option<&Value>,
        map: Option<&IndexMap>,
    ) -> (Vec<ParsedEntry>, &'static str) {
        for layer in &self.layers {
            if let Some(entries) = layer.try_parse(raw, json, map) {
                debug!(layer = layer.name(), count = entries.len(), "response parsed");
                return (entries, layer.name());
            }
        }
        debug!("all parser layers declined");
        (Vec::new(), "empty")
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(|l| l.name()).collect();
        f.debug_struct("ResponseParser").field("layers", &names).finish()
    }
}

/// Joins nicknames from the input records back onto parsed entries.
#[must_use]
pub fn join_nicknames(
    entries: Vec<ParsedEntry>,
    nicknames: &HashMap<u32, String>,
) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .map(|e| RankedEntry {
            team_number: e.team_number,
            nickname: nicknames.get(&e.team_number).cloned().unwrap_or_default(),
            score: e.score,
            reasoning: e.reasoning,
            is_fallback: false,
        })
        .collect()
}
