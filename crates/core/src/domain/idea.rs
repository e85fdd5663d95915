use serde::{Deserialize, Serialize};

/// Price band a generated idea falls into. Providers occasionally invent
/// tiers; anything unrecognized lands on `Thoughtful`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftTier {
    Safe,
    #[default]
    Thoughtful,
    Experience,
    Splurge,
}

impl GiftTier {
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "safe" => Self::Safe,
            "thoughtful" => Self::Thoughtful,
            "experience" => Self::Experience,
            "splurge" => Self::Splurge,
            _ => Self::Thoughtful,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Thoughtful => "thoughtful",
            Self::Experience => "experience",
            Self::Splurge => "splurge",
        }
    }
}

/// A generated gift idea, normalized but not yet enriched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GiftIdea {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub tier: GiftTier,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_display: Option<String>,
    pub why_it_fits: String,
    pub suggested_url: Option<String>,
    pub image_url: Option<String>,
}

/// A product resolved from the product-search provider for one idea.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub external_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price_display: Option<String>,
    pub product_url: String,
}

/// A gift idea paired with its (possibly absent) product match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichedGiftIdea {
    #[serde(flatten)]
    pub idea: GiftIdea,
    pub product: Option<ProductMatch>,
}

/// Keep only prices that are actual finite numbers.
pub fn finite_price(value: Option<f64>) -> Option<f64> {
    value.filter(|price| price.is_finite())
}

/// A usable free-text price hint carries at least one currency symbol and
/// one digit; anything else is discarded in favor of a derived display.
pub fn is_usable_price_hint(hint: &str) -> bool {
    let has_currency = hint.chars().any(|ch| matches!(ch, '$' | '€' | '£' | '¥'));
    let has_digit = hint.chars().any(|ch| ch.is_ascii_digit());
    has_currency && has_digit
}

/// Derive a display string from the numeric price range:
/// `"$25–$75"`, `"$25+"`, or `"Up to $75"`.
pub fn derive_price_display(price_min: Option<f64>, price_max: Option<f64>) -> Option<String> {
    match (price_min, price_max) {
        (Some(min), Some(max)) => {
            Some(format!("${}\u{2013}${}", format_amount(min), format_amount(max)))
        }
        (Some(min), None) => Some(format!("${}+", format_amount(min))),
        (None, Some(max)) => Some(format!("Up to ${}", format_amount(max))),
        (None, None) => None,
    }
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}
