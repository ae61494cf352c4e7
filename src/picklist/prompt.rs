//! System prompts and template builders for the ranking calls.
//!
//! Prompts are data, not code: the system templates are compiled-in
//! constants overridable from a template directory, and the user-prompt
//! builders fill machine-readable sections deterministically: identical
//! inputs produce byte-identical prompts.

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use super::budget::estimate_prompt_tokens;
use super::condense::CondensedTeam;
use super::index_map::IndexMap;
use super::priority::NormalizedPriority;
use super::types::{PickPosition, RankedEntry};

/// System prompt for the ultra-compact response format.
pub const COMPACT_SYSTEM_PROMPT: &str = r#"You are an FRC alliance-selection strategist. You rank robotics teams for a drafting team and return machine-parseable JSON.

## Output Format

Return ONLY minified single-line JSON shaped {"p":[[i,s,"r"],...],"s":"ok"}
- i: index from the index map (integer)
- s: score (number, higher is better)
- r: reason, 10 words or fewer

## Rules

- Every index from 1 to N appears in "p" exactly once. No duplicates, no omissions.
- Sort by weighted performance on the stated priorities, then by synergy with the requesting team for its pick position.
- Treat the pre-computed weighted_score as a strong prior; deviate only where metrics or notes justify it.
- If the full team list cannot fit in your response, return exactly {"s":"overflow"} and nothing else.
- Return ONLY the JSON object, no surrounding text, no code fences."#;

/// System prompt for the standard (verbose) response format.
pub const STANDARD_SYSTEM_PROMPT: &str = r#"You are an FRC alliance-selection strategist. You rank robotics teams for a drafting team based on scouting data and stated priorities.

## Instructions

1. Review the requesting team's profile, the weighted priorities, and the candidate team data.
2. Rank every candidate team from best to worst pick for the stated pick position.
3. Score each team on a single comparable scale (higher is better), anchored on the pre-computed weighted_score.
4. Give a short reasoning for each placement.

## Output Format (JSON)

```json
{
  "picklist": [
    {"team_number": <integer>, "score": <number>, "reasoning": "<string>"}
  ],
  "status": "ok"
}
```

## Rules

- Include every candidate team exactly once. No duplicates, no omissions.
- If the full team list cannot fit in your response, return {"status": "overflow"} and nothing else.
- Return ONLY the JSON object, no surrounding text."#;

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/picklist-rs/prompts";

/// Filename for the compact system template.
const COMPACT_FILENAME: &str = "compact_system.md";
/// Filename for the standard system template.
const STANDARD_FILENAME: &str = "standard_system.md";

/// Response format the compiler targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFormat {
    /// Ultra-compact index-triple format (default).
    Compact,
    /// Verbose picklist-object format (fallback).
    Standard,
}

impl PromptFormat {
    /// Returns the tag recorded in [`PromptBundle`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Standard => "standard",
        }
    }
}

/// A compiled prompt, immutable after compilation.
#[derive(Debug, Clone)]
pub struct PromptBundle {
    /// System prompt text.
    pub system: String,
    /// User prompt text.
    pub user: String,
    /// Index map covering every team in the user prompt.
    pub index_map: IndexMap,
    /// Fast estimate of the prompt size, for logging and planning.
    pub estimated_tokens: usize,
    /// Format the prompt instructs the model to answer in.
    pub format: PromptFormat,
}

/// System prompt templates for both formats.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from configuration, environment, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the compact format.
    pub compact: String,
    /// System prompt for the standard format.
    pub standard: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in
    /// defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `PICKLIST_PROMPT_DIR` environment variable
    /// 3. `~/.config/picklist-rs/prompts/`
    ///
    /// Each file is loaded independently — a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("PICKLIST_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            compact: load_file(COMPACT_FILENAME, COMPACT_SYSTEM_PROMPT),
            standard: load_file(STANDARD_FILENAME, STANDARD_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            compact: COMPACT_SYSTEM_PROMPT.to_string(),
            standard: STANDARD_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten — use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (COMPACT_FILENAME, COMPACT_SYSTEM_PROMPT),
            (STANDARD_FILENAME, STANDARD_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }

    /// Returns the system prompt for a format.
    #[must_use]
    pub fn system_for(&self, format: PromptFormat) -> &str {
        match format {
            PromptFormat::Compact => &self.compact,
            PromptFormat::Standard => &self.standard,
        }
    }
}

/// Request-level context shared by every prompt of one request.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// The requesting team's number.
    pub your_team_number: u32,
    /// Condensed profile of the requesting team, when it is in the dataset.
    pub your_team: Option<&'a CondensedTeam>,
    /// Role being drafted for.
    pub pick_position: PickPosition,
    /// Normalized priorities.
    pub priorities: &'a [NormalizedPriority],
    /// Optional game-context string from the dataset layer.
    pub game_context: Option<&'a str>,
}

/// One candidate line in the teams section.
#[derive(Serialize)]
struct TeamLine<'a> {
    i: usize,
    team: u32,
    name: &'a str,
    score: f64,
    metrics: &'a std::collections::BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

fn push_header(prompt: &mut String, ctx: &PromptContext<'_>) {
    let profile = ctx.your_team.map_or_else(
        || "not in dataset".to_string(),
        |team| serde_json::to_string(team).unwrap_or_else(|_| "{}".to_string()),
    );
    let _ = write!(
        prompt,
        "<your_team number=\"{}\" position=\"{}\">\n{}\n</your_team>\n\n",
        ctx.your_team_number, ctx.pick_position, profile,
    );

    prompt.push_str("<priorities>\n");
    for p in ctx.priorities {
        let _ = write!(prompt, "- {} w={:.3}", p.id, p.weight);
        if let Some(ref reason) = p.reason {
            let _ = write!(prompt, " | {reason}");
        }
        prompt.push('\n');
    }
    prompt.push_str("</priorities>\n\n");

    if let Some(context) = ctx.game_context {
        let _ = write!(prompt, "<game_context>\n{context}\n</game_context>\n\n");
    }
}

fn push_index_map(prompt: &mut String, map: &IndexMap) {
    let _ = write!(
        prompt,
        "<index_map count=\"{}\">\n{}\n\
         Respond with indices only. Use every index from 1 to {} exactly once. \
         Never repeat an index, never skip one.\n</index_map>\n\n",
        map.len(),
        map.render(),
        map.len(),
    );
}

fn push_teams(prompt: &mut String, teams: &[CondensedTeam]) {
    prompt.push_str("<teams>\n");
    for (i, team) in teams.iter().enumerate() {
        let line = TeamLine {
            i: i + 1,
            team: team.team_number,
            name: &team.nickname,
            score: team.weighted_score,
            metrics: &team.metrics,
            notes: team.notes.as_deref(),
        };
        let _ = writeln!(
            prompt,
            "{}",
            serde_json::to_string(&line).unwrap_or_else(|_| "{}".to_string())
        );
    }
    prompt.push_str("</teams>");
}

/// Compiles the ranking prompt for one call (the whole request in single
/// mode, one batch in batched mode).
///
/// An index map is emitted for every request regardless of team count.
#[must_use]
pub fn build_ranking_prompt(
    set: &PromptSet,
    ctx: &PromptContext<'_>,
    teams: &[CondensedTeam],
    format: PromptFormat,
) -> PromptBundle {
    let index_map = IndexMap::new(teams.iter().map(|t| t.team_number).collect());

    let mut user = String::new();
    push_header(&mut user, ctx);
    push_index_map(&mut user, &index_map);
    push_teams(&mut user, teams);

    if format == PromptFormat::Standard {
        user.push_str(
            "\n\nRank every candidate team. Respond with the picklist JSON object \
             described in your instructions, using team_number values.",
        );
    }

    let estimated_tokens = estimate_prompt_tokens(teams.len(), ctx.priorities.len(), format);

    PromptBundle {
        system: set.system_for(format).to_string(),
        user,
        index_map,
        estimated_tokens,
        format,
    }
}

/// Number of already-ranked entries shown as calibration context in the
/// omission prompt.
const OMISSION_CONTEXT_LEN: usize = 10;

/// Compiles the follow-up prompt that ranks teams omitted from the merged
/// picklist.
///
/// The current top of the merged picklist is included as scoring context;
/// only the omitted teams are candidates.
#[must_use]
pub fn build_omission_prompt(
    set: &PromptSet,
    ctx: &PromptContext<'_>,
    ranked: &[RankedEntry],
    omitted: &[CondensedTeam],
) -> PromptBundle {
    let index_map = IndexMap::new(omitted.iter().map(|t| t.team_number).collect());

    let mut user = String::new();
    push_header(&mut user, ctx);

    user.push_str("<ranked_context>\nAlready ranked (best first, scores are the scale to match):\n");
    for entry in ranked.iter().take(OMISSION_CONTEXT_LEN) {
        let _ = writeln!(
            user,
            "{}: {:.2} | {}",
            entry.team_number, entry.score, entry.reasoning
        );
    }
    user.push_str("</ranked_context>\n\n");

    push_index_map(&mut user, &index_map);
    push_teams(&mut user, omitted);
    user.push_str(
        "\n\nThese candidates were missing from the ranking above. Rank ONLY them, \
         with scores comparable to the ranked context.",
    );

    let estimated_tokens = estimate_prompt_tokens(
        omitted.len() + OMISSION_CONTEXT_LEN,
        ctx.priorities.len(),
        PromptFormat::Compact,
    );

    PromptBundle {
        system: set.compact.clone(),
        user,
        index_map,
        estimated_tokens,
        format: PromptFormat::Compact,
    }
}
