//! Detection of provider-echoed placeholder ideas.
//!
//! Generation providers sometimes echo the response schema's own
//! example-shaped defaults back ("Idea 1", "placeholder"). The patterns
//! are provider-specific heuristics, so they live in a policy value the
//! engine is constructed with rather than in the filter logic itself.

/// Filler text substituted for blank descriptions during normalization.
/// It keeps the shape contract satisfiable; the placeholder policy makes
/// sure it never reaches a final response attached to a schema-shaped title.
pub const FILLER_DESCRIPTION: &str = "A thoughtful pick for this recipient.";

/// Filler text substituted for a blank rationale during normalization.
pub const FILLER_RATIONALE: &str = "Matches what you have shared about them.";

#[derive(Clone, Debug)]
pub struct PlaceholderPolicy {
    /// Title prefixes that, followed by a number, mark a placeholder
    /// ("idea" catches "Idea 1", "idea2", ...).
    pub numbered_title_prefixes: Vec<String>,
    /// Titles that are placeholders verbatim, compared case-insensitively.
    pub literal_titles: Vec<String>,
    /// Descriptions treated as generic filler. A filler description plus a
    /// prefix-shaped title (even without a number) marks a placeholder.
    pub filler_descriptions: Vec<String>,
}

impl Default for PlaceholderPolicy {
    fn default() -> Self {
        Self {
            numbered_title_prefixes: vec!["idea".to_string()],
            literal_titles: vec!["placeholder".to_string()],
            filler_descriptions: vec![FILLER_DESCRIPTION.to_string()],
        }
    }
}

impl PlaceholderPolicy {
    pub fn is_placeholder(&self, title: &str, description: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }

        if self.literal_titles.iter().any(|literal| title.eq_ignore_ascii_case(literal)) {
            return true;
        }

        if self.title_has_numbered_prefix(title) {
            return true;
        }

        let filler = self
            .filler_descriptions
            .iter()
            .any(|candidate| description.trim().eq_ignore_ascii_case(candidate));
        filler && self.title_has_prefix_shape(title)
    }

    fn title_has_numbered_prefix(&self, title: &str) -> bool {
        let lowered = title.to_ascii_lowercase();
        self.numbered_title_prefixes.iter().any(|prefix| {
            lowered
                .strip_prefix(prefix.as_str())
                .map(|rest| rest.trim_start().starts_with(|ch: char| ch.is_ascii_digit()))
                .unwrap_or(false)
        })
    }

    fn title_has_prefix_shape(&self, title: &str) -> bool {
        let lowered = title.to_ascii_lowercase();
        self.numbered_title_prefixes.iter().any(|prefix| lowered.starts_with(prefix.as_str()))
    }
}
