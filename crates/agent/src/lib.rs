//! External-provider clients for the suggestion engine.
//!
//! This crate owns every network edge the engine crosses:
//! - `llm` — the pluggable text-completion client (OpenAI-compatible HTTP
//!   by default).
//! - `generation` — the Generation Pass Executor: prompt assembly, tolerant
//!   response parsing, and raw-idea normalization. The provider is only
//!   ever asked for loosely-shaped JSON; everything is re-validated here.
//! - `products` — the product-search client, with a deterministic mock
//!   used whenever credentials are absent so the engine degrades instead
//!   of crashing.

pub mod generation;
pub mod llm;
pub mod products;
