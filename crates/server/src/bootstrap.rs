use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use giftwell_agent::generation::GenerationPassExecutor;
use giftwell_agent::llm::HttpLlmClient;
use giftwell_agent::products::product_search_from_config;
use giftwell_core::config::{AppConfig, LlmProvider};
use giftwell_core::suggestions::SuggestionEngine;
use giftwell_db::{connect_with_settings, migrations, DbPool, SqlSuggestionStore};

pub struct App {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<SuggestionEngine>,
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<App> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .context("database connection failed")?;

    migrations::run_pending(&db_pool).await.context("database migration failed")?;

    let base_url = config
        .llm
        .base_url
        .clone()
        .unwrap_or_else(|| default_llm_base_url(config.llm.provider).to_string());
    let llm = HttpLlmClient::new(
        base_url,
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.timeout_secs,
    )
    .map_err(|error| anyhow!("llm client construction failed: {error}"))?;
    let generator = Arc::new(GenerationPassExecutor::new(Arc::new(llm), config.llm.timeout_secs));

    let products = product_search_from_config(&config.products)
        .map_err(|error| anyhow!("product search construction failed: {error}"))?;

    let store = Arc::new(SqlSuggestionStore::new(db_pool.clone()));
    let engine = Arc::new(SuggestionEngine::new(generator, products, store));

    tracing::info!(
        event_name = "system.bootstrap.completed",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        "runtime wired"
    );

    Ok(App { config, db_pool, engine })
}

/// All supported providers speak the OpenAI chat-completions shape; only
/// the host differs when no base URL is configured.
fn default_llm_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama => "http://localhost:11434",
    }
}
