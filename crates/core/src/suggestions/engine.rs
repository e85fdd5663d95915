//! Multi-pass suggestion engine implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::canonical::canonicalize;
use crate::domain::feedback::FeedbackPreference;
use crate::domain::idea::{EnrichedGiftIdea, GiftIdea, ProductMatch};
use crate::domain::recipient::{Recipient, RecipientContext, RecipientId, UserId};
use crate::domain::run::{RunId, SuggestionRun};
use crate::errors::{EngineError, GenerationError, ProductSearchError, StoreError};

use super::exclusions::{ExclusionSet, ExclusionSources};
use super::placeholder::PlaceholderPolicy;
use super::types::*;
use super::{
    EXCLUSION_PROMPT_CAP, HISTORY_IDEAS_PER_RUN_CAP, HISTORY_RUN_CAP, HISTORY_WINDOW_DAYS,
    MAX_EXTRA_PASSES, MAX_SUGGESTIONS_PER_PASS, MIN_SUGGESTIONS_PER_PASS, TOP_UP_BUFFER,
};
use super::SuggestResult;

/// One request/response cycle with the text-generation provider.
///
/// Implementations return `Err` only for provider-call failures (network,
/// auth, timeout); an unparseable or empty response is `Ok(vec![])` so the
/// controller can distinguish "provider down" from "provider rambled".
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GiftIdea>, GenerationError>;
}

/// Product lookup for one accepted idea.
#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn find_match(
        &self,
        query: &str,
        price_min_cents: Option<i64>,
        price_max_cents: Option<i64>,
    ) -> Result<Option<ProductMatch>, ProductSearchError>;
}

/// Historical reads and the final run write, all scoped to
/// `(user_id, recipient_id)`.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Ownership-checked recipient fetch. `None` means the recipient does
    /// not exist or belongs to another user; the engine treats both the
    /// same way.
    async fn recipient_for_user(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Option<Recipient>, StoreError>;

    async fn saved_idea_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<String>, StoreError>;

    /// Titles behind liked/disliked feedback, resolved through the
    /// originating run with the denormalized feedback title as fallback.
    async fn feedback_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<(FeedbackPreference, String)>, StoreError>;

    /// Suggestion titles from recent runs, windowed to `window_days` and
    /// capped at `run_cap` runs of `ideas_per_run` titles each.
    async fn recent_run_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
        window_days: i64,
        run_cap: u32,
        ideas_per_run: usize,
    ) -> Result<Vec<String>, StoreError>;

    async fn save_run(&self, run: &SuggestionRun) -> Result<(), StoreError>;
}

/// The suggestion engine. All state is request-scoped; the engine itself
/// only holds its collaborators and the placeholder policy.
pub struct SuggestionEngine {
    generator: Arc<dyn IdeaGenerator>,
    products: Arc<dyn ProductSearch>,
    store: Arc<dyn SuggestionStore>,
    placeholder_policy: PlaceholderPolicy,
}

enum Screen {
    Accept(String),
    NoKey,
    Placeholder,
    Excluded,
}

impl SuggestionEngine {
    pub fn new(
        generator: Arc<dyn IdeaGenerator>,
        products: Arc<dyn ProductSearch>,
        store: Arc<dyn SuggestionStore>,
    ) -> Self {
        Self { generator, products, store, placeholder_policy: PlaceholderPolicy::default() }
    }

    pub fn with_placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholder_policy = policy;
        self
    }

    /// Produce, enrich, and persist one suggestion run.
    pub async fn suggest(&self, request: SuggestionRequest) -> SuggestResult<SuggestionOutcome> {
        // Ownership check is fatal and happens before any provider call.
        let recipient = self
            .store
            .recipient_for_user(&request.user_id, &request.recipient_id)
            .await
            .map_err(|error| EngineError::RecipientLookup(error.to_string()))?
            .ok_or(EngineError::RecipientNotFound)?;

        let context = RecipientContext::from_recipient(
            &recipient,
            request.occasion.clone(),
            request.budget_min,
            request.budget_max,
        );

        let sources = self.gather_exclusion_sources(&request).await;
        let mut exclusions = sources.build_set();

        let target = request.target_count.max(1);
        let mut accepted: Vec<GiftIdea> = Vec::new();
        let mut filtered = FilterCounts::default();
        let mut passes_used: u32 = 0;

        while accepted.len() < target && passes_used <= MAX_EXTRA_PASSES {
            let remaining = target - accepted.len();
            let requested_count = (remaining + TOP_UP_BUFFER)
                .clamp(MIN_SUGGESTIONS_PER_PASS, MAX_SUGGESTIONS_PER_PASS);

            let generation = GenerationRequest {
                context: context.clone(),
                requested_count,
                excluded_keys: exclusions.prompt_sample(EXCLUSION_PROMPT_CAP),
            };

            let ideas = match self.generator.generate(&generation).await {
                Ok(ideas) => ideas,
                Err(error) if passes_used == 0 => {
                    warn!(
                        event_name = "suggest.generation.first_pass_failed",
                        recipient_id = %request.recipient_id,
                        error = %error,
                        "first generation pass failed; aborting request"
                    );
                    return Err(EngineError::GenerationUnavailable(error));
                }
                Err(error) => {
                    warn!(
                        event_name = "suggest.generation.top_up_failed",
                        recipient_id = %request.recipient_id,
                        pass = passes_used,
                        error = %error,
                        "top-up pass failed; keeping ideas accepted so far"
                    );
                    passes_used += 1;
                    break;
                }
            };

            for idea in ideas {
                if accepted.len() == target {
                    break;
                }
                match self.screen(&idea, &exclusions) {
                    Screen::Accept(key) => {
                        exclusions.insert_key(key);
                        accepted.push(idea);
                    }
                    Screen::NoKey => filtered.no_key += 1,
                    Screen::Placeholder => filtered.placeholder += 1,
                    Screen::Excluded => filtered.excluded += 1,
                }
            }

            passes_used += 1;
        }

        if accepted.is_empty() {
            warn!(
                event_name = "suggest.exhausted",
                recipient_id = %request.recipient_id,
                passes_used,
                filtered_excluded = filtered.excluded,
                filtered_placeholder = filtered.placeholder,
                filtered_no_key = filtered.no_key,
                "provider returned nothing usable across all passes"
            );
            return Err(EngineError::NoIdeasAccepted { passes: passes_used });
        }

        // The top-up buffer can over-collect; the count contract is exact.
        accepted.truncate(target);
        let shortfall = accepted.len() < target;
        let stats = PassStats {
            passes_used,
            top_up_passes: passes_used.saturating_sub(1),
            filtered,
            shortfall,
        };

        if shortfall {
            warn!(
                event_name = "suggest.shortfall",
                recipient_id = %request.recipient_id,
                accepted = accepted.len(),
                target,
                passes_used,
                "returning fewer ideas than requested"
            );
        }

        let enriched = self.enrich(accepted).await;

        let run = SuggestionRun {
            id: RunId::generate(),
            user_id: request.user_id.clone(),
            recipient_id: request.recipient_id.clone(),
            model: self.generator.model_id().to_string(),
            context,
            ideas: enriched,
            created_at: Utc::now(),
        };

        self.store
            .save_run(&run)
            .await
            .map_err(|error| EngineError::Persistence(error.to_string()))?;

        info!(
            event_name = "suggest.completed",
            recipient_id = %request.recipient_id,
            run_id = %run.id,
            ideas = run.ideas.len(),
            passes_used = stats.passes_used,
            top_up_passes = stats.top_up_passes,
            filtered_excluded = stats.filtered.excluded,
            filtered_placeholder = stats.filtered.placeholder,
            filtered_no_key = stats.filtered.no_key,
            shortfall = stats.shortfall,
            "suggestion run persisted"
        );

        let flags = resolve_flags(&run.ideas, &sources);
        Ok(SuggestionOutcome { run, flags, stats })
    }

    /// The four historical sources are read-only and independent, so they
    /// run concurrently. Any single failure degrades to an empty source.
    async fn gather_exclusion_sources(&self, request: &SuggestionRequest) -> ExclusionSources {
        let (saved, feedback, recent) = tokio::join!(
            self.store.saved_idea_titles(&request.user_id, &request.recipient_id),
            self.store.feedback_titles(&request.user_id, &request.recipient_id),
            self.store.recent_run_titles(
                &request.user_id,
                &request.recipient_id,
                HISTORY_WINDOW_DAYS,
                HISTORY_RUN_CAP,
                HISTORY_IDEAS_PER_RUN_CAP,
            ),
        );

        let saved_titles = saved.unwrap_or_else(|error| {
            warn!(
                event_name = "suggest.exclusions.saved_lookup_failed",
                recipient_id = %request.recipient_id,
                error = %error,
                "saved-idea lookup failed; continuing without it"
            );
            Vec::new()
        });

        let feedback_rows = feedback.unwrap_or_else(|error| {
            warn!(
                event_name = "suggest.exclusions.feedback_lookup_failed",
                recipient_id = %request.recipient_id,
                error = %error,
                "feedback lookup failed; continuing without it"
            );
            Vec::new()
        });

        let recent_run_titles = recent.unwrap_or_else(|error| {
            warn!(
                event_name = "suggest.exclusions.run_lookup_failed",
                recipient_id = %request.recipient_id,
                error = %error,
                "recent-run lookup failed; continuing without it"
            );
            Vec::new()
        });

        let mut liked_titles = Vec::new();
        let mut disliked_titles = Vec::new();
        for (preference, title) in feedback_rows {
            match preference {
                FeedbackPreference::Liked => liked_titles.push(title),
                FeedbackPreference::Disliked => disliked_titles.push(title),
            }
        }

        ExclusionSources {
            session_titles: request.session_titles.clone(),
            saved_titles,
            liked_titles,
            disliked_titles,
            recent_run_titles,
        }
    }

    fn screen(&self, idea: &GiftIdea, exclusions: &ExclusionSet) -> Screen {
        if idea.title.trim().is_empty() {
            return Screen::NoKey;
        }
        if self.placeholder_policy.is_placeholder(&idea.title, &idea.short_description) {
            return Screen::Placeholder;
        }
        let key = canonicalize(&idea.title);
        if key.is_empty() {
            return Screen::NoKey;
        }
        if exclusions.contains(&key) {
            return Screen::Excluded;
        }
        Screen::Accept(key)
    }

    /// Concurrent per-idea product lookup. Output is 1:1 with input, in
    /// input order; a failed lookup leaves that idea without a match.
    async fn enrich(&self, ideas: Vec<GiftIdea>) -> Vec<EnrichedGiftIdea> {
        let lookups = ideas.iter().map(|idea| {
            let products = Arc::clone(&self.products);
            async move {
                let price_min_cents = idea.price_min.map(to_minor_units);
                let price_max_cents = idea.price_max.map(to_minor_units);
                match products.find_match(&idea.title, price_min_cents, price_max_cents).await {
                    Ok(found) => found,
                    Err(error) => {
                        warn!(
                            event_name = "suggest.enrichment.item_failed",
                            title = %idea.title,
                            error = %error,
                            "product lookup failed; idea keeps no match"
                        );
                        None
                    }
                }
            }
        });

        let matches = join_all(lookups).await;
        ideas
            .into_iter()
            .zip(matches)
            .map(|(idea, product)| EnrichedGiftIdea { idea, product })
            .collect()
    }
}

fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn resolve_flags(ideas: &[EnrichedGiftIdea], sources: &ExclusionSources) -> Vec<IdeaFlags> {
    let saved = sources.saved_keys();
    let liked = sources.liked_keys();
    let disliked = sources.disliked_keys();

    ideas
        .iter()
        .map(|enriched| {
            let key = canonicalize(&enriched.idea.title);
            IdeaFlags {
                saved: saved.contains(&key),
                liked: liked.contains(&key),
                disliked: disliked.contains(&key),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use crate::domain::idea::GiftTier;

    use super::*;

    fn idea(title: &str) -> GiftIdea {
        GiftIdea {
            id: format!("idea-{}", title.to_ascii_lowercase().replace(' ', "-")),
            title: title.to_string(),
            short_description: format!("{title} they will actually use."),
            tier: GiftTier::Thoughtful,
            price_min: Some(25.0),
            price_max: Some(75.0),
            price_display: Some("$25\u{2013}$75".to_string()),
            why_it_fits: "Fits their interests.".to_string(),
            suggested_url: None,
            image_url: None,
        }
    }

    struct ScriptedGenerator {
        batches: Mutex<Vec<Result<Vec<GiftIdea>, GenerationError>>>,
        calls: AtomicUsize,
        seen_exclusions: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedGenerator {
        fn new(batches: Vec<Result<Vec<GiftIdea>, GenerationError>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                calls: AtomicUsize::new(0),
                seen_exclusions: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdeaGenerator for ScriptedGenerator {
        fn model_id(&self) -> &str {
            "scripted-model"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Vec<GiftIdea>, GenerationError> {
            let pass = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_exclusions.lock().unwrap().push(request.excluded_keys.clone());
            let mut batches = self.batches.lock().unwrap();
            if pass < batches.len() {
                batches[pass].clone()
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct StubProducts {
        failing_titles: HashSet<String>,
    }

    impl StubProducts {
        fn reliable() -> Self {
            Self { failing_titles: HashSet::new() }
        }

        fn failing_for(titles: &[&str]) -> Self {
            Self { failing_titles: titles.iter().map(|title| title.to_string()).collect() }
        }
    }

    #[async_trait]
    impl ProductSearch for StubProducts {
        async fn find_match(
            &self,
            query: &str,
            _price_min_cents: Option<i64>,
            _price_max_cents: Option<i64>,
        ) -> Result<Option<ProductMatch>, ProductSearchError> {
            if self.failing_titles.contains(query) {
                return Err(ProductSearchError("stubbed outage".to_string()));
            }
            Ok(Some(ProductMatch {
                external_id: format!("ext-{query}"),
                title: query.to_string(),
                image_url: None,
                price_display: Some("$49".to_string()),
                product_url: format!("https://shop.example/{query}"),
            }))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        recipient: Option<Recipient>,
        saved_titles: Vec<String>,
        feedback: Vec<(FeedbackPreference, String)>,
        recent_titles: Vec<String>,
        fail_saved_lookup: bool,
        fail_save_run: bool,
        persisted: Mutex<Vec<SuggestionRun>>,
    }

    impl MemoryStore {
        fn with_recipient() -> Self {
            Self { recipient: Some(recipient_fixture()), ..Self::default() }
        }
    }

    fn recipient_fixture() -> Recipient {
        Recipient {
            id: RecipientId("rec-1".to_string()),
            user_id: UserId("user-1".to_string()),
            name: "Maya".to_string(),
            relationship: Some("sister".to_string()),
            gender: None,
            notes: Some("loves ceramics and espresso".to_string()),
            annual_budget: Some(400.0),
            gift_budget_min: Some(25.0),
            gift_budget_max: Some(75.0),
            interests: Vec::new(),
            gift_history: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[async_trait]
    impl SuggestionStore for MemoryStore {
        async fn recipient_for_user(
            &self,
            user_id: &UserId,
            recipient_id: &RecipientId,
        ) -> Result<Option<Recipient>, StoreError> {
            Ok(self
                .recipient
                .clone()
                .filter(|recipient| {
                    &recipient.user_id == user_id && &recipient.id == recipient_id
                }))
        }

        async fn saved_idea_titles(
            &self,
            _user_id: &UserId,
            _recipient_id: &RecipientId,
        ) -> Result<Vec<String>, StoreError> {
            if self.fail_saved_lookup {
                return Err(StoreError("saved lookup outage".to_string()));
            }
            Ok(self.saved_titles.clone())
        }

        async fn feedback_titles(
            &self,
            _user_id: &UserId,
            _recipient_id: &RecipientId,
        ) -> Result<Vec<(FeedbackPreference, String)>, StoreError> {
            Ok(self.feedback.clone())
        }

        async fn recent_run_titles(
            &self,
            _user_id: &UserId,
            _recipient_id: &RecipientId,
            _window_days: i64,
            _run_cap: u32,
            _ideas_per_run: usize,
        ) -> Result<Vec<String>, StoreError> {
            Ok(self.recent_titles.clone())
        }

        async fn save_run(&self, run: &SuggestionRun) -> Result<(), StoreError> {
            if self.fail_save_run {
                return Err(StoreError("write outage".to_string()));
            }
            self.persisted.lock().unwrap().push(run.clone());
            Ok(())
        }
    }

    fn engine(
        generator: Arc<ScriptedGenerator>,
        products: StubProducts,
        store: Arc<MemoryStore>,
    ) -> SuggestionEngine {
        SuggestionEngine::new(generator, Arc::new(products), store)
    }

    fn request() -> SuggestionRequest {
        SuggestionRequest::new("user-1", "rec-1").with_target_count(5)
    }

    #[tokio::test]
    async fn happy_path_accepts_five_in_one_pass() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Ceramic Glaze Kit"),
            idea("Latte Art Pitcher"),
            idea("Kiln Class"),
        ])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::clone(&store));

        let outcome = engine.suggest(request()).await.unwrap();

        assert_eq!(outcome.run.ideas.len(), 5);
        assert_eq!(outcome.stats.passes_used, 1);
        assert!(!outcome.stats.shortfall);
        assert!(outcome.run.ideas.iter().all(|enriched| enriched.product.is_some()));
        assert_eq!(store.persisted.lock().unwrap().len(), 1);
        assert_eq!(outcome.run.model, "scripted-model");
        assert_eq!(outcome.flags.len(), 5);
    }

    #[tokio::test]
    async fn ownership_violation_fails_before_any_provider_call() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![idea("Anything")])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), store);

        let result = engine
            .suggest(SuggestionRequest::new("intruder", "rec-1").with_target_count(5))
            .await;

        assert!(matches!(result, Err(EngineError::RecipientNotFound)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_heavy_provider_exhausts_all_passes_and_fails() {
        let duplicates = || {
            Ok(vec![
                idea("Pottery Wheel"),
                idea("Espresso Tamper"),
                idea("Ceramic Glaze Kit"),
                idea("Latte Art Pitcher"),
                idea("Kiln Class"),
            ])
        };
        let generator = Arc::new(ScriptedGenerator::new(vec![
            duplicates(),
            duplicates(),
            duplicates(),
            duplicates(),
        ]));
        let mut store = MemoryStore::with_recipient();
        store.recent_titles = vec![
            "Pottery Wheel".to_string(),
            "Espresso Tampers".to_string(),
            "Ceramic Glaze Kit".to_string(),
            "Latte Art Pitcher".to_string(),
            "Kiln Classes".to_string(),
        ];
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::new(store));

        let result = engine.suggest(request()).await;

        assert!(matches!(result, Err(EngineError::NoIdeasAccepted { passes: 4 })));
        assert_eq!(generator.calls(), 4);
    }

    #[tokio::test]
    async fn partial_shortfall_is_returned_not_failed() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(vec![idea("Pottery Wheel"), idea("Espresso Tamper"), idea("Kiln Class")]),
            Ok(vec![idea("Pottery Wheel"), idea("Linen Apron"), idea("Recipe Stand")]),
            Ok(vec![idea("Linen Apron"), idea("Bread Lame")]),
            Ok(vec![idea("Bread Lame")]),
        ]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::clone(&store));

        let outcome = engine
            .suggest(SuggestionRequest::new("user-1", "rec-1").with_target_count(9))
            .await
            .unwrap();

        assert_eq!(outcome.run.ideas.len(), 6);
        assert!(outcome.stats.shortfall);
        assert_eq!(outcome.stats.passes_used, 4);
        assert_eq!(store.persisted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepted_ideas_never_repeat_across_passes() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(vec![idea("Pottery Wheel"), idea("Espresso Tamper")]),
            Ok(vec![
                idea("Pottery Wheels"),
                idea("Espresso Tamper!"),
                idea("Kiln Class"),
                idea("Linen Apron"),
                idea("Recipe Stand"),
            ]),
        ]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), store);

        let outcome = engine.suggest(request()).await.unwrap();

        let keys: HashSet<String> = outcome
            .run
            .ideas
            .iter()
            .map(|enriched| canonicalize(&enriched.idea.title))
            .collect();
        assert_eq!(keys.len(), outcome.run.ideas.len());
        assert_eq!(outcome.run.ideas.len(), 5);
        assert_eq!(outcome.stats.filtered.excluded, 2);

        // Pass 2's prompt must carry the keys accepted in pass 1.
        let seen = generator.seen_exclusions.lock().unwrap();
        assert!(seen[1].contains(&"pottery wheel".to_string()));
        assert!(seen[1].contains(&"espresso tamper".to_string()));
    }

    #[tokio::test]
    async fn first_pass_provider_failure_is_fatal() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(GenerationError::Timeout(90))]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::clone(&store));

        let result = engine.suggest(request()).await;

        assert!(matches!(
            result,
            Err(EngineError::GenerationUnavailable(GenerationError::Timeout(90)))
        ));
        assert!(store.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_pass_failure_keeps_accepted_ideas() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(vec![idea("Pottery Wheel"), idea("Espresso Tamper"), idea("Kiln Class")]),
            Err(GenerationError::Provider("mid-flight outage".to_string())),
        ]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::clone(&store));

        let outcome = engine.suggest(request()).await.unwrap();

        assert_eq!(outcome.run.ideas.len(), 3);
        assert!(outcome.stats.shortfall);
        assert_eq!(store.persisted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enrichment_failures_are_isolated_per_idea() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
            idea("Linen Apron"),
            idea("Recipe Stand"),
        ])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let products = StubProducts::failing_for(&["Espresso Tamper", "Linen Apron"]);
        let engine = engine(Arc::clone(&generator), products, store);

        let outcome = engine.suggest(request()).await.unwrap();

        assert_eq!(outcome.run.ideas.len(), 5);
        let titles: Vec<&str> =
            outcome.run.ideas.iter().map(|enriched| enriched.idea.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Pottery Wheel", "Espresso Tamper", "Kiln Class", "Linen Apron", "Recipe Stand"]
        );
        for enriched in &outcome.run.ideas {
            let should_fail =
                enriched.idea.title == "Espresso Tamper" || enriched.idea.title == "Linen Apron";
            assert_eq!(enriched.product.is_none(), should_fail, "{}", enriched.idea.title);
        }
    }

    #[tokio::test]
    async fn placeholders_and_blank_titles_are_filtered_with_counts() {
        let mut blank = idea("placeholder-slot");
        blank.title = "   ".to_string();
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            blank,
            idea("Idea 3"),
            idea("placeholder"),
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
        ])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), store);

        let outcome = engine
            .suggest(SuggestionRequest::new("user-1", "rec-1").with_target_count(3))
            .await
            .unwrap();

        assert_eq!(outcome.run.ideas.len(), 3);
        assert_eq!(outcome.stats.filtered.no_key, 1);
        assert_eq!(outcome.stats.filtered.placeholder, 2);
        assert_eq!(outcome.stats.passes_used, 1);
    }

    #[tokio::test]
    async fn caller_session_titles_are_excluded_up_front() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
            idea("Linen Apron"),
            idea("Recipe Stand"),
            idea("Bread Lame"),
        ])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), store);

        let outcome = engine
            .suggest(
                SuggestionRequest::new("user-1", "rec-1")
                    .with_target_count(5)
                    .with_session_titles(vec!["Pottery Wheels!".to_string()]),
            )
            .await
            .unwrap();

        assert!(outcome
            .run
            .ideas
            .iter()
            .all(|enriched| enriched.idea.title != "Pottery Wheel"));
        assert_eq!(outcome.stats.filtered.excluded, 1);
        assert_eq!(outcome.run.ideas.len(), 5);
    }

    #[tokio::test]
    async fn failed_history_sub_lookup_degrades_gracefully() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
            idea("Linen Apron"),
            idea("Recipe Stand"),
        ])]));
        let mut store = MemoryStore::with_recipient();
        store.fail_saved_lookup = true;
        store.recent_titles = vec!["Recipe Stand".to_string()];
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::new(store));

        let outcome = engine.suggest(request()).await.unwrap();

        // The surviving source still filters; the failed one is skipped.
        assert!(outcome.run.ideas.iter().all(|enriched| enriched.idea.title != "Recipe Stand"));
        assert_eq!(outcome.run.ideas.len(), 4);
        assert!(outcome.stats.shortfall);
    }

    #[tokio::test]
    async fn persistence_failure_fails_the_request() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
            idea("Linen Apron"),
            idea("Recipe Stand"),
        ])]));
        let mut store = MemoryStore::with_recipient();
        store.fail_save_run = true;
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), Arc::new(store));

        let result = engine.suggest(request()).await;

        assert!(matches!(result, Err(EngineError::Persistence(_))));
    }

    #[tokio::test]
    async fn over_collection_is_trimmed_to_target() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(vec![
            idea("Pottery Wheel"),
            idea("Espresso Tamper"),
            idea("Kiln Class"),
            idea("Linen Apron"),
            idea("Recipe Stand"),
        ])]));
        let store = Arc::new(MemoryStore::with_recipient());
        let engine = engine(Arc::clone(&generator), StubProducts::reliable(), store);

        let outcome = engine
            .suggest(SuggestionRequest::new("user-1", "rec-1").with_target_count(3))
            .await
            .unwrap();

        assert_eq!(outcome.run.ideas.len(), 3);
        assert_eq!(outcome.flags.len(), 3);
    }
}
