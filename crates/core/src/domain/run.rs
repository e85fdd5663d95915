use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::idea::EnrichedGiftIdea;
use super::recipient::{RecipientContext, RecipientId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted batch of enriched suggestions. Immutable once written;
/// feedback and saves reference it by id and idea index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestionRun {
    pub id: RunId,
    pub user_id: UserId,
    pub recipient_id: RecipientId,
    pub model: String,
    pub context: RecipientContext,
    pub ideas: Vec<EnrichedGiftIdea>,
    pub created_at: DateTime<Utc>,
}
