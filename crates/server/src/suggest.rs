//! The suggestion endpoint: POST /api/suggestions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use giftwell_core::errors::InterfaceError;
use giftwell_core::suggestions::{
    SuggestionEngine, SuggestionOutcome, SuggestionRequest, DEFAULT_SUGGESTION_COUNT,
    MAX_SUGGESTIONS_PER_PASS,
};
use giftwell_db::DbPool;

use crate::auth::{authenticate, AuthError};

#[derive(Clone)]
pub struct SuggestState {
    pub db_pool: DbPool,
    pub engine: Arc<SuggestionEngine>,
}

pub fn router(state: SuggestState) -> Router {
    Router::new().route("/api/suggestions", post(create_suggestions)).with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequestBody {
    pub recipient_id: String,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub budget_min: Option<f64>,
    #[serde(default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub num_suggestions: Option<usize>,
    #[serde(default)]
    pub previous_suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponseBody {
    pub run_id: String,
    pub recipient_id: String,
    pub model: String,
    pub created_at: String,
    pub ideas: Vec<IdeaResponse>,
    pub meta: MetaResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub tier: &'static str,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_display: Option<String>,
    pub why_it_fits: String,
    pub suggested_url: Option<String>,
    pub image_url: Option<String>,
    pub product: Option<ProductResponse>,
    pub saved: bool,
    pub liked: bool,
    pub disliked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price_display: Option<String>,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub passes_used: u32,
    pub top_up_passes: u32,
    pub shortfall: bool,
    pub filtered_excluded: u32,
    pub filtered_placeholder: u32,
    pub filtered_no_key: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub async fn create_suggestions(
    State(state): State<SuggestState>,
    headers: HeaderMap,
    Json(body): Json<SuggestRequestBody>,
) -> Result<Json<SuggestResponseBody>, ErrorResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    let user_id = match authenticate(&state.db_pool, &headers).await {
        Ok(user_id) => user_id,
        Err(error) => return Err(auth_error_response(error, correlation_id)),
    };

    if let Err(message) = validate_body(&body) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            InterfaceError::BadRequest { message, correlation_id: correlation_id.clone() },
            correlation_id,
        ));
    }

    let target_count = body.num_suggestions.unwrap_or(DEFAULT_SUGGESTION_COUNT);
    let mut request = SuggestionRequest::new(user_id.0, body.recipient_id)
        .with_budget(body.budget_min, body.budget_max)
        .with_target_count(target_count)
        .with_session_titles(body.previous_suggestions);
    if let Some(occasion) = body.occasion {
        request = request.with_occasion(occasion);
    }

    info!(
        event_name = "api.suggest.received",
        correlation_id = %correlation_id,
        recipient_id = %request.recipient_id,
        target_count,
        "suggestion request received"
    );

    match state.engine.suggest(request).await {
        Ok(outcome) => Ok(Json(response_body(outcome))),
        Err(error) => {
            let interface = error.into_interface(correlation_id.clone());
            let status = status_for(&interface);
            Err(error_response(status, interface, correlation_id))
        }
    }
}

fn validate_body(body: &SuggestRequestBody) -> Result<(), String> {
    if body.recipient_id.trim().is_empty() {
        return Err("recipientId must not be empty".to_string());
    }

    if let Some(count) = body.num_suggestions {
        if count == 0 || count > MAX_SUGGESTIONS_PER_PASS {
            return Err(format!(
                "numSuggestions must be between 1 and {MAX_SUGGESTIONS_PER_PASS}"
            ));
        }
    }

    for (label, value) in [("budgetMin", body.budget_min), ("budgetMax", body.budget_max)] {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{label} must be a non-negative number"));
            }
        }
    }

    if let (Some(min), Some(max)) = (body.budget_min, body.budget_max) {
        if min > max {
            return Err("budgetMin must not exceed budgetMax".to_string());
        }
    }

    Ok(())
}

fn response_body(outcome: SuggestionOutcome) -> SuggestResponseBody {
    let SuggestionOutcome { run, flags, stats } = outcome;

    let ideas = run
        .ideas
        .into_iter()
        .zip(flags)
        .map(|(enriched, flags)| IdeaResponse {
            id: enriched.idea.id,
            title: enriched.idea.title,
            short_description: enriched.idea.short_description,
            tier: enriched.idea.tier.as_str(),
            price_min: enriched.idea.price_min,
            price_max: enriched.idea.price_max,
            price_display: enriched.idea.price_display,
            why_it_fits: enriched.idea.why_it_fits,
            suggested_url: enriched.idea.suggested_url,
            image_url: enriched.idea.image_url,
            product: enriched.product.map(|product| ProductResponse {
                id: product.external_id,
                title: product.title,
                image_url: product.image_url,
                price_display: product.price_display,
                url: product.product_url,
            }),
            saved: flags.saved,
            liked: flags.liked,
            disliked: flags.disliked,
        })
        .collect();

    SuggestResponseBody {
        run_id: run.id.0,
        recipient_id: run.recipient_id.0,
        model: run.model,
        created_at: run.created_at.to_rfc3339(),
        ideas,
        meta: MetaResponse {
            passes_used: stats.passes_used,
            top_up_passes: stats.top_up_passes,
            shortfall: stats.shortfall,
            filtered_excluded: stats.filtered.excluded,
            filtered_placeholder: stats.filtered.placeholder,
            filtered_no_key: stats.filtered.no_key,
        },
    }
}

fn auth_error_response(error: AuthError, correlation_id: String) -> ErrorResponse {
    match error {
        AuthError::MissingToken | AuthError::UnknownToken => error_response(
            StatusCode::UNAUTHORIZED,
            InterfaceError::Unauthorized {
                message: error.to_string(),
                correlation_id: correlation_id.clone(),
            },
            correlation_id,
        ),
        AuthError::Lookup(message) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::ServiceUnavailable {
                message,
                correlation_id: correlation_id.clone(),
            },
            correlation_id,
        ),
    }
}

fn status_for(interface: &InterfaceError) -> StatusCode {
    match interface {
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(
    status: StatusCode,
    interface: InterfaceError,
    correlation_id: String,
) -> ErrorResponse {
    warn!(
        event_name = "api.suggest.failed",
        correlation_id = %correlation_id,
        status = status.as_u16(),
        detail = %interface,
        "suggestion request failed"
    );

    (status, Json(ErrorBody { error: interface.user_message().to_string(), correlation_id }))
}
