//! # picklist-rs
//!
//! LLM-driven alliance-selection picklist core for FRC scouting data.
//!
//! The hard part of picklist generation is not the ranking itself but the
//! orchestration that makes a non-deterministic, token-limited,
//! rate-limited, occasionally malformed model behave like a reliable
//! ranking engine: request planning, ultra-compact index-mapped prompts,
//! budget-guarded execution with bounded retry, layered response
//! recovery, batch coordination with live progress, and fingerprint-keyed
//! caching.
//!
//! # Example
//!
//! ```no_run
//! use picklist_rs::picklist::{
//!     GeneratorConfig, PickPosition, PicklistGenerator, PicklistRequest, Priority,
//!     StaticDataset,
//! };
//!
//! # async fn run() -> Result<(), picklist_rs::error::PicklistError> {
//! let config = GeneratorConfig::from_env()?;
//! let generator = PicklistGenerator::from_config(config)?;
//!
//! let dataset = StaticDataset::new(load_records());
//! let request = PicklistRequest {
//!     your_team_number: 1234,
//!     pick_position: PickPosition::First,
//!     priorities: vec![Priority {
//!         id: "auto_points".to_string(),
//!         weight: 2.0,
//!         reason: None,
//!     }],
//!     exclude_teams: Vec::new(),
//!     team_numbers: None,
//!     use_batching: None,
//!     batch_size: None,
//!     reference_teams_count: 3,
//!     reference_selection: Default::default(),
//! };
//!
//! let result = generator.generate(&dataset, &request).await;
//! println!("{} teams ranked", result.picklist.len());
//! # Ok(())
//! # }
//! # fn load_records() -> Vec<picklist_rs::picklist::TeamRecord> { Vec::new() }
//! ```

pub mod error;
pub mod picklist;
pub mod provider;

pub use error::{ErrorKind, PicklistError};
pub use picklist::{GeneratorConfig, PicklistGenerator, PicklistRequest, RankingResult};
