use serde::Serialize;

use giftwell_core::config::{AppConfig, LlmProvider, LoadOptions};
use giftwell_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

pub fn run(json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "error",
                detail: format!("configuration issue: {error}"),
            });
            None
        }
    };

    if let Some(config) = &config {
        let provider = match config.llm.provider {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        };
        checks.push(DoctorCheck {
            name: "llm",
            status: "ok",
            detail: format!(
                "provider {provider}, model {}, timeout {}s",
                config.llm.model, config.llm.timeout_secs
            ),
        });

        checks.push(match &config.products.base_url {
            Some(base_url) => DoctorCheck {
                name: "products",
                status: "ok",
                detail: format!("product search via {base_url}"),
            },
            None => DoctorCheck {
                name: "products",
                status: "ok",
                detail: "no provider configured; deterministic mock in use".to_string(),
            },
        });

        checks.push(database_check(config));
    }

    let status = if checks.iter().all(|check| check.status == "ok") { "ok" } else { "error" };
    let report = DoctorReport { status, checks };

    if json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"detail\":\"{error}\"}}"))
    } else {
        render_text(&report)
    }
}

fn database_check(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database",
                status: "error",
                detail: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| error.to_string())?;
        sqlx_ping(&pool).await?;
        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database",
            status: "ok",
            detail: format!("connected to {}", config.database.url),
        },
        Err(detail) => DoctorCheck { name: "database", status: "error", detail },
    }
}

async fn sqlx_ping(pool: &giftwell_db::DbPool) -> Result<(), String> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|error| error.to_string())
}

fn render_text(report: &DoctorReport) -> String {
    let mut lines = vec![format!("doctor: {}", report.status)];
    for check in &report.checks {
        lines.push(format!("  [{}] {}: {}", check.status, check.name, check.detail));
    }
    lines.join("\n")
}
