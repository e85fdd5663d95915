//! Types for the Suggestion Engine

use serde::Serialize;

use crate::domain::recipient::{RecipientContext, RecipientId, UserId};
use crate::domain::run::SuggestionRun;

/// Request for one batch of gift suggestions
#[derive(Clone, Debug)]
pub struct SuggestionRequest {
    /// Caller the recipient must belong to
    pub user_id: UserId,
    /// Recipient to suggest for
    pub recipient_id: RecipientId,
    /// Optional occasion carried into the prompt
    pub occasion: Option<String>,
    /// Per-gift budget floor, overriding the stored range
    pub budget_min: Option<f64>,
    /// Per-gift budget ceiling, overriding the stored range
    pub budget_max: Option<f64>,
    /// Number of ideas the caller wants back
    pub target_count: usize,
    /// Titles already shown this session, excluded up front
    pub session_titles: Vec<String>,
}

impl SuggestionRequest {
    pub fn new(user_id: impl Into<String>, recipient_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            recipient_id: RecipientId(recipient_id.into()),
            occasion: None,
            budget_min: None,
            budget_max: None,
            target_count: super::DEFAULT_SUGGESTION_COUNT,
            session_titles: Vec::new(),
        }
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn with_budget(mut self, budget_min: Option<f64>, budget_max: Option<f64>) -> Self {
        self.budget_min = budget_min;
        self.budget_max = budget_max;
        self
    }

    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    pub fn with_session_titles(mut self, titles: Vec<String>) -> Self {
        self.session_titles = titles;
        self
    }
}

/// One generation pass as handed to the provider executor.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub context: RecipientContext,
    pub requested_count: usize,
    pub excluded_keys: Vec<String>,
}

/// Ideas dropped during filtering, by reason. Diagnostic only; never
/// surfaced to the caller as failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub excluded: u32,
    pub placeholder: u32,
    pub no_key: u32,
}

/// How the multi-pass loop went.
#[derive(Clone, Debug, Serialize)]
pub struct PassStats {
    pub passes_used: u32,
    pub top_up_passes: u32,
    pub filtered: FilterCounts,
    pub shortfall: bool,
}

/// Saved/liked/disliked history flags for one returned idea.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdeaFlags {
    pub saved: bool,
    pub liked: bool,
    pub disliked: bool,
}

/// A successful engine run: the persisted record, per-idea history flags
/// (index-aligned with `run.ideas`), and pass diagnostics.
#[derive(Clone, Debug)]
pub struct SuggestionOutcome {
    pub run: SuggestionRun,
    pub flags: Vec<IdeaFlags>,
    pub stats: PassStats,
}
