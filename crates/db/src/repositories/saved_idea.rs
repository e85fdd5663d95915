use chrono::{DateTime, Utc};
use sqlx::Row;

use giftwell_core::domain::feedback::SavedIdea;
use giftwell_core::domain::recipient::{RecipientId, UserId};
use giftwell_core::domain::run::RunId;

use super::{RepositoryError, SavedIdeaRepository};
use crate::DbPool;

pub struct SqlSavedIdeaRepository {
    pool: DbPool,
}

impl SqlSavedIdeaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_saved_idea(row: &sqlx::sqlite::SqliteRow) -> Result<SavedIdea, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recipient_id: String =
        row.try_get("recipient_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let source_run_id: Option<String> =
        row.try_get("source_run_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(SavedIdea {
        id,
        user_id: UserId(user_id),
        recipient_id: RecipientId(recipient_id),
        title,
        description,
        source_run_id: source_run_id.map(RunId),
        created_at,
    })
}

#[async_trait::async_trait]
impl SavedIdeaRepository for SqlSavedIdeaRepository {
    async fn list_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<SavedIdea>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, recipient_id, title, description, source_run_id, created_at
             FROM saved_ideas
             WHERE user_id = ? AND recipient_id = ?
             ORDER BY created_at DESC",
        )
        .bind(&user_id.0)
        .bind(&recipient_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_saved_idea).collect()
    }

    async fn save(&self, idea: SavedIdea) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO saved_ideas
                (id, user_id, recipient_id, title, description, source_run_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&idea.id)
        .bind(&idea.user_id.0)
        .bind(&idea.recipient_id.0)
        .bind(&idea.title)
        .bind(&idea.description)
        .bind(idea.source_run_id.as_ref().map(|run_id| run_id.0.clone()))
        .bind(idea.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
