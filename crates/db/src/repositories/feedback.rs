use chrono::{DateTime, Utc};
use sqlx::Row;

use giftwell_core::domain::feedback::{FeedbackPreference, IdeaFeedback};
use giftwell_core::domain::recipient::{RecipientId, UserId};
use giftwell_core::domain::run::RunId;

use super::{FeedbackRepository, RepositoryError};
use crate::DbPool;

pub struct SqlFeedbackRepository {
    pool: DbPool,
}

impl SqlFeedbackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> Result<IdeaFeedback, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recipient_id: String =
        row.try_get("recipient_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let run_id: String =
        row.try_get("run_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let idea_index: Option<i64> =
        row.try_get("idea_index").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let preference_str: String =
        row.try_get("preference").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: Option<String> =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let preference = FeedbackPreference::parse(&preference_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown feedback preference `{preference_str}`"))
    })?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(IdeaFeedback {
        id,
        user_id: UserId(user_id),
        recipient_id: RecipientId(recipient_id),
        run_id: RunId(run_id),
        idea_index: idea_index.and_then(|index| u32::try_from(index).ok()),
        preference,
        title,
        created_at,
    })
}

#[async_trait::async_trait]
impl FeedbackRepository for SqlFeedbackRepository {
    async fn list_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<IdeaFeedback>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, recipient_id, run_id, idea_index, preference, title, created_at
             FROM idea_feedback
             WHERE user_id = ? AND recipient_id = ?
             ORDER BY created_at DESC",
        )
        .bind(&user_id.0)
        .bind(&recipient_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_feedback).collect()
    }

    async fn save(&self, feedback: IdeaFeedback) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO idea_feedback
                (id, user_id, recipient_id, run_id, idea_index, preference, title, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&feedback.id)
        .bind(&feedback.user_id.0)
        .bind(&feedback.recipient_id.0)
        .bind(&feedback.run_id.0)
        .bind(feedback.idea_index.map(i64::from))
        .bind(feedback.preference.as_str())
        .bind(&feedback.title)
        .bind(feedback.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
