//! Adapter between the suggestion engine's store seam and the SQL
//! repositories.

use std::collections::HashMap;

use async_trait::async_trait;

use giftwell_core::domain::feedback::FeedbackPreference;
use giftwell_core::domain::recipient::{Recipient, RecipientId, UserId};
use giftwell_core::domain::run::SuggestionRun;
use giftwell_core::errors::StoreError;
use giftwell_core::suggestions::SuggestionStore;

use crate::repositories::{
    FeedbackRepository, RecipientRepository, RepositoryError, RunRepository, SavedIdeaRepository,
    SqlFeedbackRepository, SqlRecipientRepository, SqlRunRepository, SqlSavedIdeaRepository,
};
use crate::DbPool;

pub struct SqlSuggestionStore {
    recipients: SqlRecipientRepository,
    saved_ideas: SqlSavedIdeaRepository,
    feedback: SqlFeedbackRepository,
    runs: SqlRunRepository,
}

impl SqlSuggestionStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            recipients: SqlRecipientRepository::new(pool.clone()),
            saved_ideas: SqlSavedIdeaRepository::new(pool.clone()),
            feedback: SqlFeedbackRepository::new(pool.clone()),
            runs: SqlRunRepository::new(pool),
        }
    }
}

fn store_error(error: RepositoryError) -> StoreError {
    StoreError(error.to_string())
}

#[async_trait]
impl SuggestionStore for SqlSuggestionStore {
    async fn recipient_for_user(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Option<Recipient>, StoreError> {
        self.recipients.find_owned(user_id, recipient_id).await.map_err(store_error)
    }

    async fn saved_idea_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<String>, StoreError> {
        let ideas =
            self.saved_ideas.list_for_recipient(user_id, recipient_id).await.map_err(store_error)?;
        Ok(ideas.into_iter().map(|idea| idea.title).collect())
    }

    async fn feedback_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
    ) -> Result<Vec<(FeedbackPreference, String)>, StoreError> {
        let rows =
            self.feedback.list_for_recipient(user_id, recipient_id).await.map_err(store_error)?;

        // Titles come from the run that produced the feedback; the
        // denormalized copy on the row covers runs that are gone. A failed
        // run lookup counts as "run unavailable", not a request failure.
        let mut run_cache: HashMap<String, Option<SuggestionRun>> = HashMap::new();
        let mut titles = Vec::new();

        for row in rows {
            let run = match run_cache.get(&row.run_id.0) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched =
                        self.runs.find_owned(user_id, &row.run_id).await.unwrap_or(None);
                    run_cache.insert(row.run_id.0.clone(), fetched.clone());
                    fetched
                }
            };

            let from_run = run.as_ref().and_then(|run| {
                row.idea_index
                    .and_then(|index| run.ideas.get(index as usize))
                    .map(|enriched| enriched.idea.title.clone())
            });

            let title = from_run
                .or(row.title)
                .map(|title| title.trim().to_string())
                .filter(|title| !title.is_empty());

            if let Some(title) = title {
                titles.push((row.preference, title));
            }
        }

        Ok(titles)
    }

    async fn recent_run_titles(
        &self,
        user_id: &UserId,
        recipient_id: &RecipientId,
        window_days: i64,
        run_cap: u32,
        ideas_per_run: usize,
    ) -> Result<Vec<String>, StoreError> {
        let runs = self
            .runs
            .recent_for_recipient(user_id, recipient_id, window_days, run_cap)
            .await
            .map_err(store_error)?;

        Ok(runs
            .iter()
            .flat_map(|run| {
                run.ideas.iter().take(ideas_per_run).map(|enriched| enriched.idea.title.clone())
            })
            .collect())
    }

    async fn save_run(&self, run: &SuggestionRun) -> Result<(), StoreError> {
        self.runs.save(run).await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use giftwell_core::domain::feedback::IdeaFeedback;
    use giftwell_core::domain::idea::{EnrichedGiftIdea, GiftIdea, GiftTier};
    use giftwell_core::domain::recipient::RecipientContext;
    use giftwell_core::domain::run::RunId;

    use crate::connect_with_settings;
    use crate::migrations;

    use super::*;

    async fn store() -> (SqlSuggestionStore, DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        (SqlSuggestionStore::new(pool.clone()), pool)
    }

    fn user() -> UserId {
        UserId("user-1".to_string())
    }

    fn recipient_id() -> RecipientId {
        RecipientId("rec-1".to_string())
    }

    fn recipient_fixture() -> Recipient {
        Recipient {
            id: recipient_id(),
            user_id: user(),
            name: "Maya".to_string(),
            relationship: Some("sister".to_string()),
            gender: None,
            notes: None,
            annual_budget: None,
            gift_budget_min: Some(25.0),
            gift_budget_max: Some(75.0),
            interests: Vec::new(),
            gift_history: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn enriched(title: &str) -> EnrichedGiftIdea {
        EnrichedGiftIdea {
            idea: GiftIdea {
                id: Uuid::new_v4().to_string(),
                title: title.to_string(),
                short_description: format!("{title} description"),
                tier: GiftTier::Thoughtful,
                price_min: Some(25.0),
                price_max: Some(75.0),
                price_display: None,
                why_it_fits: "fits".to_string(),
                suggested_url: None,
                image_url: None,
            },
            product: None,
        }
    }

    fn run_fixture(titles: &[&str], age_days: i64) -> SuggestionRun {
        SuggestionRun {
            id: RunId(Uuid::new_v4().to_string()),
            user_id: user(),
            recipient_id: recipient_id(),
            model: "test-model".to_string(),
            context: RecipientContext::from_recipient(&recipient_fixture(), None, None, None),
            ideas: titles.iter().map(|title| enriched(title)).collect(),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn recipient_lookup_is_row_level_scoped() {
        let (store, pool) = store().await;
        store.recipients.save(recipient_fixture()).await.expect("save recipient");

        let owned = store.recipient_for_user(&user(), &recipient_id()).await.expect("lookup");
        assert!(owned.is_some());

        let foreign = store
            .recipient_for_user(&UserId("intruder".to_string()), &recipient_id())
            .await
            .expect("lookup");
        assert!(foreign.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn run_round_trip_preserves_ideas_and_scoping() {
        let (store, pool) = store().await;
        let run = run_fixture(&["Pottery Wheel", "Kiln Class"], 0);
        store.save_run(&run).await.expect("save run");

        let loaded = store.runs.find_owned(&user(), &run.id).await.expect("find").expect("run");
        assert_eq!(loaded.model, "test-model");
        assert_eq!(loaded.ideas.len(), 2);
        assert_eq!(loaded.ideas[0].idea.title, "Pottery Wheel");

        let foreign =
            store.runs.find_owned(&UserId("intruder".to_string()), &run.id).await.expect("find");
        assert!(foreign.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn feedback_titles_join_runs_and_fall_back_to_inline_title() {
        let (store, pool) = store().await;
        let run = run_fixture(&["Pottery Wheel", "Kiln Class"], 1);
        store.save_run(&run).await.expect("save run");

        let joined = IdeaFeedback {
            id: Uuid::new_v4().to_string(),
            user_id: user(),
            recipient_id: recipient_id(),
            run_id: run.id.clone(),
            idea_index: Some(1),
            preference: FeedbackPreference::Liked,
            title: None,
            created_at: Utc::now(),
        };
        let orphaned = IdeaFeedback {
            id: Uuid::new_v4().to_string(),
            user_id: user(),
            recipient_id: recipient_id(),
            run_id: RunId("gone".to_string()),
            idea_index: Some(0),
            preference: FeedbackPreference::Disliked,
            title: Some("Leather Wallet".to_string()),
            created_at: Utc::now(),
        };
        let unresolvable = IdeaFeedback {
            id: Uuid::new_v4().to_string(),
            user_id: user(),
            recipient_id: recipient_id(),
            run_id: RunId("also-gone".to_string()),
            idea_index: None,
            preference: FeedbackPreference::Disliked,
            title: None,
            created_at: Utc::now(),
        };
        for feedback in [joined, orphaned, unresolvable] {
            store.feedback.save(feedback).await.expect("save feedback");
        }

        let mut titles =
            store.feedback_titles(&user(), &recipient_id()).await.expect("feedback titles");
        titles.sort_by(|a, b| a.1.cmp(&b.1));

        assert_eq!(
            titles,
            vec![
                (FeedbackPreference::Liked, "Kiln Class".to_string()),
                (FeedbackPreference::Disliked, "Leather Wallet".to_string()),
            ]
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn recent_run_titles_apply_window_and_caps() {
        let (store, pool) = store().await;
        store.save_run(&run_fixture(&["Newest A", "Newest B", "Newest C"], 0)).await.unwrap();
        store.save_run(&run_fixture(&["Middle A", "Middle B"], 5)).await.unwrap();
        store.save_run(&run_fixture(&["Oldest A"], 10)).await.unwrap();
        store.save_run(&run_fixture(&["Ancient A"], 120)).await.unwrap();

        // run_cap keeps the two newest in-window runs; ideas_per_run trims
        // each run's contribution.
        let titles = store
            .recent_run_titles(&user(), &recipient_id(), 90, 2, 2)
            .await
            .expect("recent titles");

        assert_eq!(
            titles,
            vec![
                "Newest A".to_string(),
                "Newest B".to_string(),
                "Middle A".to_string(),
                "Middle B".to_string(),
            ]
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn saved_idea_titles_are_scoped_to_the_pair() {
        let (store, pool) = store().await;
        store.recipients.save(recipient_fixture()).await.expect("save recipient");
        let mut sibling = recipient_fixture();
        sibling.id = RecipientId("rec-2".to_string());
        sibling.name = "Noah".to_string();
        store.recipients.save(sibling).await.expect("save recipient");

        let mine = giftwell_core::domain::feedback::SavedIdea {
            id: Uuid::new_v4().to_string(),
            user_id: user(),
            recipient_id: recipient_id(),
            title: "Espresso Tamper".to_string(),
            description: None,
            source_run_id: None,
            created_at: Utc::now(),
        };
        let other_recipient = giftwell_core::domain::feedback::SavedIdea {
            id: Uuid::new_v4().to_string(),
            user_id: user(),
            recipient_id: RecipientId("rec-2".to_string()),
            title: "Board Game".to_string(),
            description: None,
            source_run_id: None,
            created_at: Utc::now(),
        };
        store.saved_ideas.save(mine).await.expect("save");
        store.saved_ideas.save(other_recipient).await.expect("save");

        let titles = store.saved_idea_titles(&user(), &recipient_id()).await.expect("titles");
        assert_eq!(titles, vec!["Espresso Tamper".to_string()]);

        pool.close().await;
    }
}
