use async_trait::async_trait;
use thiserror::Error;

use giftwell_core::domain::feedback::{IdeaFeedback, SavedIdea};
use giftwell_core::domain::recipient::{Recipient, RecipientId, UserId};
use giftwell_core::domain::run::{RunId, SuggestionRun};

pub mod feedback;
pub mod recipient;
pub mod run;
pub mod saved_idea;

pub use feedback::SqlFeedbackRepository;
pub use recipient::SqlRecipientRepository;
pub use run::SqlRunRepository;
pub use saved_idea::SqlSavedIdeaRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RecipientRepository: Send + Sync {
    /// Fetch a recipient only if it belongs to `user_id`. Every caller goes
    /// through this; there is no unscoped lookup.
    async fn find_owned(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Option<Recipient>, RepositoryError>;

    async fn save(&self, recipient: Recipient) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SavedIdeaRepository: Send + Sync {
    async fn list_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<SavedIdea>, RepositoryError>;

    async fn save(&self, idea: SavedIdea) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn list_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<IdeaFeedback>, RepositoryError>;

    async fn save(&self, feedback: IdeaFeedback) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert one immutable run. Runs are never updated.
    async fn save(&self, run: &SuggestionRun) -> Result<(), RepositoryError>;

    async fn find_owned(
        &self,
        user_id: &UserId,
        run_id: &RunId,
    ) -> Result<Option<SuggestionRun>, RepositoryError>;

    /// Most recent runs for a recipient inside the rolling window, newest
    /// first, capped at `limit`.
    async fn recent_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
        window_days: i64,
        limit: u32,
    ) -> Result<Vec<SuggestionRun>, RepositoryError>;
}
