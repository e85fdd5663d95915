use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::recipient::{RecipientId, UserId};
use super::run::RunId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackPreference {
    Liked,
    Disliked,
}

impl FeedbackPreference {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "liked" => Some(Self::Liked),
            "disliked" => Some(Self::Disliked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::Disliked => "disliked",
        }
    }
}

/// Liked/disliked feedback on one idea of a historical run. `title` is a
/// denormalized copy used when the originating run is no longer available.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdeaFeedback {
    pub id: String,
    pub user_id: UserId,
    pub recipient_id: RecipientId,
    pub run_id: RunId,
    pub idea_index: Option<u32>,
    pub preference: FeedbackPreference,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An idea the user explicitly saved for a recipient.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedIdea {
    pub id: String,
    pub user_id: UserId,
    pub recipient_id: RecipientId,
    pub title: String,
    pub description: Option<String>,
    pub source_run_id: Option<RunId>,
    pub created_at: DateTime<Utc>,
}
