//! Request-local bijection between contiguous 1-based indices and team
//! numbers.
//!
//! The index map is the primary defense against the model duplicating or
//! omitting teams: the prompt instructs the model to answer in index space,
//! and the parser trusts only indices present in the map. Because each
//! batch gets its own map, a response can never be attributed to another
//! batch's team set.

use std::fmt::Write;

/// Bijection from indices `1..=N` to team numbers for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    teams: Vec<u32>,
}

impl IndexMap {
    /// Builds a map over team numbers in the given order.
    #[must_use]
    pub const fn new(teams: Vec<u32>) -> Self {
        Self { teams }
    }

    /// Looks up the team number for a 1-based index. Unknown indices
    /// return `None`; the parser rejects them.
    #[must_use]
    pub fn team_for(&self, index: usize) -> Option<u32> {
        if index == 0 {
            return None;
        }
        self.teams.get(index - 1).copied()
    }

    /// Number of mapped teams.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.teams.len()
    }

    /// Returns `true` if the map holds no teams.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Iterates `(index, team_number)` pairs in index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.teams.iter().enumerate().map(|(i, t)| (i + 1, *t))
    }

    /// Renders the map as a single prompt line: `1=254 2=1678 …`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, team) in self.entries() {
            if index > 1 {
                out.push(' ');
            }
            let _ = write!(out, "{index}={team}");
        }
        out
    }
}
