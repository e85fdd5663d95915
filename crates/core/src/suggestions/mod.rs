//! Gift Suggestion Engine
//!
//! Drives the text-generation provider through a bounded number of passes,
//! filters each batch against an ever-growing canonical-key exclusion set,
//! enriches survivors with product matches, and persists the result as one
//! immutable run.

mod engine;
mod exclusions;
mod placeholder;
mod types;

pub use engine::{IdeaGenerator, ProductSearch, SuggestionEngine, SuggestionStore};
pub use exclusions::{ExclusionSet, ExclusionSources};
pub use placeholder::{PlaceholderPolicy, FILLER_DESCRIPTION, FILLER_RATIONALE};
pub use types::*;

use crate::errors::EngineError;

/// Result type for engine operations
pub type SuggestResult<T> = Result<T, EngineError>;

/// Smallest count ever requested from the provider in one pass
pub const MIN_SUGGESTIONS_PER_PASS: usize = 3;

/// Largest count ever requested from the provider in one pass
pub const MAX_SUGGESTIONS_PER_PASS: usize = 10;

/// Extra ideas requested beyond the shortfall to absorb filtering losses
pub const TOP_UP_BUFFER: usize = 2;

/// Additional passes allowed after the first (4 passes total)
pub const MAX_EXTRA_PASSES: u32 = 3;

/// Exclusion keys included in a prompt, capped to bound prompt size
pub const EXCLUSION_PROMPT_CAP: usize = 30;

/// Default number of suggestions per request
pub const DEFAULT_SUGGESTION_COUNT: usize = 5;

/// Historical runs older than this never feed the exclusion set
pub const HISTORY_WINDOW_DAYS: i64 = 90;

/// Most recent runs consulted when building exclusions
pub const HISTORY_RUN_CAP: u32 = 24;

/// Idea titles taken from each historical run
pub const HISTORY_IDEAS_PER_RUN_CAP: usize = 20;
