use chrono::{DateTime, Utc};
use sqlx::Row;

use giftwell_core::domain::recipient::{Recipient, RecipientId, UserId};

use super::{RecipientRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecipientRepository {
    pool: DbPool,
}

impl SqlRecipientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_recipient(row: &sqlx::sqlite::SqliteRow) -> Result<Recipient, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let relationship: Option<String> =
        row.try_get("relationship").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gender: Option<String> =
        row.try_get("gender").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let annual_budget: Option<f64> =
        row.try_get("annual_budget").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gift_budget_min: Option<f64> =
        row.try_get("gift_budget_min").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gift_budget_max: Option<f64> =
        row.try_get("gift_budget_max").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let interests_json: Option<String> =
        row.try_get("interests").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gift_history_json: Option<String> =
        row.try_get("gift_history").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let interests =
        interests_json.and_then(|json| serde_json::from_str(&json).ok()).unwrap_or_default();
    let gift_history =
        gift_history_json.and_then(|json| serde_json::from_str(&json).ok()).unwrap_or_default();

    Ok(Recipient {
        id: RecipientId(id),
        user_id: UserId(user_id),
        name,
        relationship,
        gender,
        notes,
        annual_budget,
        gift_budget_min,
        gift_budget_max,
        interests,
        gift_history,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait::async_trait]
impl RecipientRepository for SqlRecipientRepository {
    async fn find_owned(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Option<Recipient>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, relationship, gender, notes,
                    annual_budget, gift_budget_min, gift_budget_max,
                    interests, gift_history, created_at, updated_at
             FROM recipients
             WHERE id = ? AND user_id = ?",
        )
        .bind(&recipient_id.0)
        .bind(&user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_recipient).transpose()
    }

    async fn save(&self, recipient: Recipient) -> Result<(), RepositoryError> {
        let interests = serde_json::to_string(&recipient.interests)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let gift_history = serde_json::to_string(&recipient.gift_history)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO recipients
                (id, user_id, name, relationship, gender, notes,
                 annual_budget, gift_budget_min, gift_budget_max,
                 interests, gift_history, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                relationship = excluded.relationship,
                gender = excluded.gender,
                notes = excluded.notes,
                annual_budget = excluded.annual_budget,
                gift_budget_min = excluded.gift_budget_min,
                gift_budget_max = excluded.gift_budget_max,
                interests = excluded.interests,
                gift_history = excluded.gift_history,
                updated_at = excluded.updated_at",
        )
        .bind(&recipient.id.0)
        .bind(&recipient.user_id.0)
        .bind(&recipient.name)
        .bind(&recipient.relationship)
        .bind(&recipient.gender)
        .bind(&recipient.notes)
        .bind(recipient.annual_budget)
        .bind(recipient.gift_budget_min)
        .bind(recipient.gift_budget_max)
        .bind(&interests)
        .bind(&gift_history)
        .bind(recipient.created_at.to_rfc3339())
        .bind(recipient.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
