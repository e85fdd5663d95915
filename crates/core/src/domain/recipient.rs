use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notes are free text; only this many characters ever reach a prompt.
pub const NOTES_PROMPT_CHAR_CAP: usize = 280;
/// At most this many interest categories are carried into a prompt context.
pub const MAX_INTEREST_CATEGORIES: usize = 3;
/// At most this many recent gift-history summaries are carried into a prompt context.
pub const MAX_GIFT_HISTORY_SUMMARIES: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category of short labels describing the recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestCategory {
    pub kind: InterestKind,
    pub labels: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    Interest,
    Vibe,
    Personality,
    Brand,
}

/// One line of gift history, summarized for prompting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GiftHistorySummary {
    pub summary: String,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub given_at: Option<DateTime<Utc>>,
}

/// Stored recipient profile, owned by a single user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub user_id: UserId,
    pub name: String,
    pub relationship: Option<String>,
    pub gender: Option<String>,
    pub notes: Option<String>,
    pub annual_budget: Option<f64>,
    pub gift_budget_min: Option<f64>,
    pub gift_budget_max: Option<f64>,
    pub interests: Vec<InterestCategory>,
    pub gift_history: Vec<GiftHistorySummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a recipient used to build one generation prompt.
///
/// Built fresh per request and persisted with the run it produced; never
/// updated in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipientContext {
    pub recipient_id: RecipientId,
    pub name: String,
    pub relationship: Option<String>,
    pub gender: Option<String>,
    pub notes: Option<String>,
    pub annual_budget: Option<f64>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub interests: Vec<InterestCategory>,
    pub gift_history: Vec<GiftHistorySummary>,
    pub occasion: Option<String>,
}

impl RecipientContext {
    /// Snapshot a stored recipient for prompting. Request-level budget
    /// bounds win over the stored per-gift range; notes are truncated and
    /// interest/history lists capped.
    pub fn from_recipient(
        recipient: &Recipient,
        occasion: Option<String>,
        budget_min: Option<f64>,
        budget_max: Option<f64>,
    ) -> Self {
        Self {
            recipient_id: recipient.id.clone(),
            name: recipient.name.clone(),
            relationship: recipient.relationship.clone(),
            gender: recipient.gender.clone(),
            notes: recipient
                .notes
                .as_deref()
                .map(|notes| truncate_chars(notes, NOTES_PROMPT_CHAR_CAP))
                .filter(|notes| !notes.trim().is_empty()),
            annual_budget: recipient.annual_budget,
            budget_min: budget_min.or(recipient.gift_budget_min),
            budget_max: budget_max.or(recipient.gift_budget_max),
            interests: recipient.interests.iter().take(MAX_INTEREST_CATEGORIES).cloned().collect(),
            gift_history: recipient
                .gift_history
                .iter()
                .take(MAX_GIFT_HISTORY_SUMMARIES)
                .cloned()
                .collect(),
            occasion,
        }
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn recipient_fixture() -> Recipient {
        Recipient {
            id: RecipientId("rec-1".to_string()),
            user_id: UserId("user-1".to_string()),
            name: "Maya".to_string(),
            relationship: Some("sister".to_string()),
            gender: None,
            notes: Some("x".repeat(500)),
            annual_budget: Some(400.0),
            gift_budget_min: Some(25.0),
            gift_budget_max: Some(75.0),
            interests: (0..5)
                .map(|index| InterestCategory {
                    kind: InterestKind::Interest,
                    labels: vec![format!("label-{index}")],
                })
                .collect(),
            gift_history: (0..5)
                .map(|index| GiftHistorySummary {
                    summary: format!("gift {index}"),
                    occasion: None,
                    given_at: None,
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn context_truncates_notes_and_caps_lists() {
        let context = RecipientContext::from_recipient(&recipient_fixture(), None, None, None);

        assert_eq!(context.notes.as_ref().map(String::len), Some(NOTES_PROMPT_CHAR_CAP));
        assert_eq!(context.interests.len(), MAX_INTEREST_CATEGORIES);
        assert_eq!(context.gift_history.len(), MAX_GIFT_HISTORY_SUMMARIES);
    }

    #[test]
    fn request_budget_overrides_stored_range() {
        let context = RecipientContext::from_recipient(
            &recipient_fixture(),
            Some("birthday".to_string()),
            Some(50.0),
            None,
        );

        assert_eq!(context.budget_min, Some(50.0));
        assert_eq!(context.budget_max, Some(75.0));
        assert_eq!(context.occasion.as_deref(), Some("birthday"));
    }
}
