//! Generation Pass Executor.
//!
//! One pass = one completion request. The provider is asked for structured
//! JSON but is never trusted to return it: the body is parsed tolerantly
//! (full parse, then first balanced `{...}` span) and each raw idea is
//! normalized into the engine's shape before any filtering happens. An
//! unusable body is an empty pass, not an error; only the provider call
//! itself failing is an error, so the controller can tell the two apart.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use giftwell_core::domain::idea::{
    derive_price_display, finite_price, is_usable_price_hint, GiftIdea, GiftTier,
};
use giftwell_core::domain::recipient::RecipientContext;
use giftwell_core::errors::GenerationError;
use giftwell_core::suggestions::{
    GenerationRequest, IdeaGenerator, EXCLUSION_PROMPT_CAP, FILLER_DESCRIPTION, FILLER_RATIONALE,
    MAX_SUGGESTIONS_PER_PASS, MIN_SUGGESTIONS_PER_PASS,
};

use crate::llm::{LlmClient, LlmError};

const SYSTEM_INSTRUCTIONS: &str = "You help a gifting assistant brainstorm gift ideas. \
Respond with a single JSON object of the form {\"suggestions\": [...]} and nothing else. \
Each suggestion has: id, title, short_description, tier (one of safe, thoughtful, \
experience, splurge), price_min, price_max, price_hint, why_it_fits, suggested_url, \
image_url. Titles must be concrete, purchasable gift ideas. Never repeat anything \
listed under disallowed_titles, including close variants of those titles.";

pub struct GenerationPassExecutor {
    client: Arc<dyn LlmClient>,
    timeout_secs: u64,
}

impl GenerationPassExecutor {
    pub fn new(client: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self { client, timeout_secs }
    }

    fn map_error(&self, error: LlmError) -> GenerationError {
        match error {
            LlmError::Timeout => GenerationError::Timeout(self.timeout_secs),
            LlmError::Auth => GenerationError::Auth,
            other => GenerationError::Provider(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct PromptPayload<'a> {
    recipient: &'a RecipientContext,
    requested_count: usize,
    disallowed_titles: &'a [String],
}

#[async_trait]
impl IdeaGenerator for GenerationPassExecutor {
    fn model_id(&self) -> &str {
        self.client.model()
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GiftIdea>, GenerationError> {
        let requested_count = request
            .requested_count
            .clamp(MIN_SUGGESTIONS_PER_PASS, MAX_SUGGESTIONS_PER_PASS);
        let capped_exclusions: Vec<String> =
            request.excluded_keys.iter().take(EXCLUSION_PROMPT_CAP).cloned().collect();

        let payload = PromptPayload {
            recipient: &request.context,
            requested_count,
            disallowed_titles: &capped_exclusions,
        };
        let payload = serde_json::to_string(&payload)
            .map_err(|error| GenerationError::Provider(error.to_string()))?;

        let body = self
            .client
            .complete(SYSTEM_INSTRUCTIONS, &payload)
            .await
            .map_err(|error| self.map_error(error))?;

        let raw = parse_suggestions(&body);
        debug!(
            event_name = "generation.pass_parsed",
            requested_count,
            parsed = raw.len(),
            body_bytes = body.len(),
            "generation pass response parsed"
        );

        Ok(raw.into_iter().enumerate().map(|(index, raw)| normalize_idea(index, raw)).collect())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSuggestionResponse {
    #[serde(default)]
    suggestions: Vec<RawIdea>,
}

/// One suggestion as the provider shaped it. Every field is optional and
/// numerics arrive as raw JSON values so one malformed field never sinks
/// the batch.
#[derive(Debug, Default, Deserialize)]
struct RawIdea {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    price_min: Option<Value>,
    #[serde(default)]
    price_max: Option<Value>,
    #[serde(default, alias = "price_guidance")]
    price_hint: Option<String>,
    #[serde(default)]
    why_it_fits: Option<String>,
    #[serde(default)]
    suggested_url: Option<String>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
}

/// Parse the provider body into raw suggestions, tolerating surrounding
/// prose. Returns an empty list when nothing object-like can be recovered.
fn parse_suggestions(body: &str) -> Vec<RawIdea> {
    if let Ok(parsed) = serde_json::from_str::<RawSuggestionResponse>(body) {
        return parsed.suggestions;
    }

    if let Some(span) = first_balanced_object(body) {
        if let Ok(parsed) = serde_json::from_str::<RawSuggestionResponse>(span) {
            return parsed.suggestions;
        }
    }

    Vec::new()
}

/// The first balanced `{...}` span in `input`, honoring JSON string
/// literals and escapes.
fn first_balanced_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in input[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Coerce a provider idea into the engine's shape. A blank title becomes a
/// numbered placeholder the controller's placeholder filter rejects, so a
/// half-formed idea never silently survives.
fn normalize_idea(index: usize, raw: RawIdea) -> GiftIdea {
    let title = raw
        .title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| format!("Idea {}", index + 1));

    let tier = raw.tier.as_deref().map(GiftTier::parse_or_default).unwrap_or_default();

    let price_min = finite_price(raw.price_min.as_ref().and_then(Value::as_f64));
    let price_max = finite_price(raw.price_max.as_ref().and_then(Value::as_f64));

    let price_display = raw
        .price_hint
        .map(|hint| hint.trim().to_string())
        .filter(|hint| is_usable_price_hint(hint))
        .or_else(|| derive_price_display(price_min, price_max));

    let short_description = raw
        .short_description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| FILLER_DESCRIPTION.to_string());

    let why_it_fits = raw
        .why_it_fits
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| FILLER_RATIONALE.to_string());

    let id = raw
        .id
        .and_then(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("gen-{index}"));

    GiftIdea {
        id,
        title,
        short_description,
        tier,
        price_min,
        price_max,
        price_display,
        why_it_fits,
        suggested_url: raw.suggested_url.filter(|url| !url.trim().is_empty()),
        image_url: raw.image_url.filter(|url| !url.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawIdea {
        serde_json::from_str(json).expect("raw idea fixture should parse")
    }

    #[test]
    fn valid_body_parses_directly() {
        let body = r#"{"suggestions": [{"title": "Pottery Wheel"}, {"title": "Kiln Class"}]}"#;

        let parsed = parse_suggestions(body);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title.as_deref(), Some("Pottery Wheel"));
    }

    #[test]
    fn prose_wrapped_body_falls_back_to_brace_extraction() {
        let body = concat!(
            "Sure! Here are some ideas you might like:\n\n",
            r#"{"suggestions": [{"title": "Espresso Tamper", "tier": "safe"}]}"#,
            "\n\nLet me know if you want more."
        );

        let parsed = parse_suggestions(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].tier.as_deref(), Some("safe"));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let body = r#"note: {"suggestions": [{"title": "Mug with {initials}", "short_description": "A \"custom\" mug"}]} trailing"#;

        let parsed = parse_suggestions(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title.as_deref(), Some("Mug with {initials}"));
    }

    #[test]
    fn unusable_bodies_yield_an_empty_pass() {
        assert!(parse_suggestions("").is_empty());
        assert!(parse_suggestions("no json here at all").is_empty());
        assert!(parse_suggestions("{ this is { not json").is_empty());
    }

    #[test]
    fn object_without_suggestions_key_is_an_empty_pass() {
        assert!(parse_suggestions(r#"{"ideas": [{"title": "Wrong Key"}]}"#).is_empty());
    }

    #[test]
    fn blank_title_becomes_a_numbered_placeholder() {
        let idea = normalize_idea(2, raw(r#"{"title": "   "}"#));
        assert_eq!(idea.title, "Idea 3");

        let idea = normalize_idea(0, raw("{}"));
        assert_eq!(idea.title, "Idea 1");
    }

    #[test]
    fn unknown_tier_defaults_and_known_tier_sticks() {
        let idea = normalize_idea(0, raw(r#"{"title": "Kiln Class", "tier": "extravagant"}"#));
        assert_eq!(idea.tier, GiftTier::Thoughtful);

        let idea = normalize_idea(0, raw(r#"{"title": "Kiln Class", "tier": "splurge"}"#));
        assert_eq!(idea.tier, GiftTier::Splurge);
    }

    #[test]
    fn malformed_numeric_prices_become_null() {
        let idea = normalize_idea(
            0,
            raw(r#"{"title": "Kiln Class", "price_min": "cheap", "price_max": 75}"#),
        );
        assert_eq!(idea.price_min, None);
        assert_eq!(idea.price_max, Some(75.0));
    }

    #[test]
    fn unusable_price_hint_is_replaced_by_derived_display() {
        let idea = normalize_idea(
            0,
            raw(r#"{"title": "Kiln Class", "price_hint": "mid-range", "price_min": 25, "price_max": 75}"#),
        );
        assert_eq!(idea.price_display.as_deref(), Some("$25\u{2013}$75"));

        let idea = normalize_idea(
            0,
            raw(r#"{"title": "Kiln Class", "price_hint": "$40 to $60", "price_min": 25}"#),
        );
        assert_eq!(idea.price_display.as_deref(), Some("$40 to $60"));
    }

    #[test]
    fn price_guidance_and_image_url_variants_are_accepted() {
        let idea = normalize_idea(
            0,
            raw(r#"{"title": "Kiln Class", "price_guidance": "$30+", "imageUrl": "https://img.example/kiln.jpg"}"#),
        );
        assert_eq!(idea.price_display.as_deref(), Some("$30+"));
        assert_eq!(idea.image_url.as_deref(), Some("https://img.example/kiln.jpg"));
    }

    #[test]
    fn blank_text_fields_get_filler_defaults() {
        let idea = normalize_idea(
            0,
            raw(r#"{"title": "Kiln Class", "short_description": " ", "why_it_fits": ""}"#),
        );
        assert_eq!(idea.short_description, FILLER_DESCRIPTION);
        assert_eq!(idea.why_it_fits, FILLER_RATIONALE);
    }

    #[test]
    fn provider_ids_are_kept_and_index_fills_gaps() {
        let idea = normalize_idea(4, raw(r#"{"title": "Kiln Class", "id": 7}"#));
        assert_eq!(idea.id, "7");

        let idea = normalize_idea(4, raw(r#"{"title": "Kiln Class"}"#));
        assert_eq!(idea.id, "gen-4");
    }
}
