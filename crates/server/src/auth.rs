//! Bearer-token resolution for the API surface.
//!
//! Tokens live in the `api_tokens` table rather than in any hardcoded
//! allowlist; issuing and revoking them is an operator concern outside
//! this service.

use axum::http::{header, HeaderMap};
use sqlx::Row;
use thiserror::Error;

use giftwell_core::domain::recipient::UserId;
use giftwell_db::DbPool;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingToken,
    #[error("unknown bearer credential")]
    UnknownToken,
    #[error("token lookup failed: {0}")]
    Lookup(String),
}

pub async fn authenticate(pool: &DbPool, headers: &HeaderMap) -> Result<UserId, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;

    let row = sqlx::query("SELECT user_id FROM api_tokens WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(|error| AuthError::Lookup(error.to_string()))?;

    match row {
        Some(row) => {
            let user_id: String =
                row.try_get("user_id").map_err(|error| AuthError::Lookup(error.to_string()))?;
            Ok(UserId(user_id))
        }
        None => Err(AuthError::UnknownToken),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
