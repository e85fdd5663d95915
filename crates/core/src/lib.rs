//! giftwell-core: domain types and the suggestion engine.
//!
//! The engine is the center of the system: it drives the text-generation
//! provider through bounded passes, deduplicates against canonical-key
//! exclusions built from history, enriches survivors with product matches,
//! and persists each batch as an immutable run. External collaborators
//! (LLM, product search, storage) plug in through the trait seams in
//! [`suggestions`].

pub mod canonical;
pub mod config;
pub mod domain;
pub mod errors;
pub mod suggestions;

pub use canonical::canonicalize;
pub use domain::feedback::{FeedbackPreference, IdeaFeedback, SavedIdea};
pub use domain::idea::{EnrichedGiftIdea, GiftIdea, GiftTier, ProductMatch};
pub use domain::recipient::{Recipient, RecipientContext, RecipientId, UserId};
pub use domain::run::{RunId, SuggestionRun};
pub use errors::{
    EngineError, GenerationError, InterfaceError, ProductSearchError, StoreError,
};
