//! Dataset seam.
//!
//! The core never touches the filesystem: callers hand it something that
//! can produce the full list of [`TeamRecord`]s for a dataset handle and an
//! optional game-context string.

use super::types::TeamRecord;
use crate::error::PicklistError;

/// Provides team records and game context for one dataset.
pub trait DatasetSource: Send + Sync {
    /// Returns every team record in the dataset.
    ///
    /// # Errors
    ///
    /// Implementations surface load failures as [`PicklistError`]; the
    /// generator reports them as an error result.
    fn team_records(&self) -> Result<Vec<TeamRecord>, PicklistError>;

    /// Returns the game-context string, when the dataset carries one.
    fn game_context(&self) -> Option<String>;
}

/// Dataset source over pre-loaded records.
#[derive(Debug, Clone, Default)]
pub struct StaticDataset {
    records: Vec<TeamRecord>,
    context: Option<String>,
}

impl StaticDataset {
    /// Wraps pre-loaded records.
    #[must_use]
    pub const fn new(records: Vec<TeamRecord>) -> Self {
        Self {
            records,
            context: None,
        }
    }

    /// Attaches a game-context string.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl DatasetSource for StaticDataset {
    fn team_records(&self) -> Result<Vec<TeamRecord>, PicklistError> {
        Ok(self.records.clone())
    }

    fn game_context(&self) -> Option<String> {
        self.context.clone()
    }
}
