//! Canonical-key exclusion tracking.

use std::collections::HashSet;

use crate::canonical::canonicalize;

/// Set of canonical keys the generator must never reproduce. Keeps
/// insertion order so prompt samples are deterministic, and silently
/// refuses keys that canonicalize to nothing.
#[derive(Clone, Debug, Default)]
pub struct ExclusionSet {
    keys: HashSet<String>,
    order: Vec<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Insert an already-canonical key. Empty keys are never valid entries.
    pub fn insert_key(&mut self, key: String) -> bool {
        if key.is_empty() || self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key.clone());
        self.order.push(key);
        true
    }

    /// Canonicalize a title and insert its key.
    pub fn insert_title(&mut self, title: &str) -> bool {
        self.insert_key(canonicalize(title))
    }

    /// First `cap` keys in insertion order, for the prompt's
    /// "do not suggest" list.
    pub fn prompt_sample(&self, cap: usize) -> Vec<String> {
        self.order.iter().take(cap).cloned().collect()
    }
}

/// Everything the exclusion set is seeded from, kept per source so the
/// response layer can resolve saved/liked/disliked flags by key.
#[derive(Clone, Debug, Default)]
pub struct ExclusionSources {
    pub session_titles: Vec<String>,
    pub saved_titles: Vec<String>,
    pub liked_titles: Vec<String>,
    pub disliked_titles: Vec<String>,
    pub recent_run_titles: Vec<String>,
}

impl ExclusionSources {
    pub fn build_set(&self) -> ExclusionSet {
        let mut set = ExclusionSet::new();
        for title in self
            .session_titles
            .iter()
            .chain(&self.saved_titles)
            .chain(&self.liked_titles)
            .chain(&self.disliked_titles)
            .chain(&self.recent_run_titles)
        {
            set.insert_title(title);
        }
        set
    }

    pub fn saved_keys(&self) -> HashSet<String> {
        key_set(&self.saved_titles)
    }

    pub fn liked_keys(&self) -> HashSet<String> {
        key_set(&self.liked_titles)
    }

    pub fn disliked_keys(&self) -> HashSet<String> {
        key_set(&self.disliked_titles)
    }
}

fn key_set(titles: &[String]) -> HashSet<String> {
    titles.iter().map(|title| canonicalize(title)).filter(|key| !key.is_empty()).collect()
}
