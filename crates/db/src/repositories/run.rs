use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use giftwell_core::domain::recipient::{RecipientId, UserId};
use giftwell_core::domain::run::{RunId, SuggestionRun};

use super::{RepositoryError, RunRepository};
use crate::DbPool;

pub struct SqlRunRepository {
    pool: DbPool,
}

impl SqlRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_run(row: &sqlx::sqlite::SqliteRow) -> Result<SuggestionRun, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recipient_id: String =
        row.try_get("recipient_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let model: String = row.try_get("model").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let context_json: String =
        row.try_get("context").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ideas_json: String =
        row.try_get("ideas").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let context = serde_json::from_str(&context_json)
        .map_err(|e| RepositoryError::Decode(format!("run context: {e}")))?;
    let ideas = serde_json::from_str(&ideas_json)
        .map_err(|e| RepositoryError::Decode(format!("run ideas: {e}")))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(SuggestionRun {
        id: RunId(id),
        user_id: UserId(user_id),
        recipient_id: RecipientId(recipient_id),
        model,
        context,
        ideas,
        created_at,
    })
}

#[async_trait::async_trait]
impl RunRepository for SqlRunRepository {
    async fn save(&self, run: &SuggestionRun) -> Result<(), RepositoryError> {
        let context = serde_json::to_string(&run.context)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let ideas =
            serde_json::to_string(&run.ideas).map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO suggestion_runs
                (id, user_id, recipient_id, model, context, ideas, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.id.0)
        .bind(&run.user_id.0)
        .bind(&run.recipient_id.0)
        .bind(&run.model)
        .bind(&context)
        .bind(&ideas)
        .bind(run.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_owned(
        &self,
        user_id: &UserId,
        run_id: &RunId,
    ) -> Result<Option<SuggestionRun>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, recipient_id, model, context, ideas, created_at
             FROM suggestion_runs
             WHERE id = ? AND user_id = ?",
        )
        .bind(&run_id.0)
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_run).transpose()
    }

    async fn recent_for_recipient(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
        window_days: i64,
        limit: u32,
    ) -> Result<Vec<SuggestionRun>, RepositoryError> {
        let cutoff = (Utc::now() - Duration::days(window_days)).to_rfc3339();

        let rows = sqlx::query(
            "SELECT id, user_id, recipient_id, model, context, ideas, created_at
             FROM suggestion_runs
             WHERE user_id = ? AND recipient_id = ? AND created_at >= ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(&recipient_id.0)
        .bind(&cutoff)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_run).collect()
    }
}
