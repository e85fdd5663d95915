//! Product-search provider clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;

use giftwell_core::config::ProductSearchConfig;
use giftwell_core::domain::idea::{derive_price_display, ProductMatch};
use giftwell_core::errors::ProductSearchError;
use giftwell_core::suggestions::ProductSearch;

/// HTTP product-search client. One GET per idea; the first candidate wins.
pub struct HttpProductSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpProductSearch {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, ProductSearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| ProductSearchError(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: String,
    title: String,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(default)]
    price_display: Option<String>,
    #[serde(default, alias = "link")]
    url: Option<String>,
}

#[async_trait]
impl ProductSearch for HttpProductSearch {
    async fn find_match(
        &self,
        query: &str,
        price_min_cents: Option<i64>,
        price_max_cents: Option<i64>,
    ) -> Result<Option<ProductMatch>, ProductSearchError> {
        let mut request = self
            .client
            .get(format!("{}/v1/products/search", self.base_url))
            .query(&[("query", query)]);
        if let Some(min) = price_min_cents {
            request = request.query(&[("price_min", min)]);
        }
        if let Some(max) = price_max_cents {
            request = request.query(&[("price_max", max)]);
        }
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| ProductSearchError(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProductSearchError(format!("provider returned status {status}")));
        }

        let body: SearchResponse =
            response.json().await.map_err(|error| ProductSearchError(error.to_string()))?;

        Ok(body.products.into_iter().next().map(|item| ProductMatch {
            product_url: item
                .url
                .unwrap_or_else(|| format!("{}/products/{}", self.base_url, item.id)),
            external_id: item.id,
            title: item.title,
            image_url: item.image_url,
            price_display: item.price_display,
        }))
    }
}

/// Deterministic stand-in used when no product provider is configured.
/// Same query, same match, across processes and test runs.
pub struct MockProductSearch;

#[async_trait]
impl ProductSearch for MockProductSearch {
    async fn find_match(
        &self,
        query: &str,
        price_min_cents: Option<i64>,
        price_max_cents: Option<i64>,
    ) -> Result<Option<ProductMatch>, ProductSearchError> {
        let slug = slugify(query);
        if slug.is_empty() {
            return Ok(None);
        }

        let price_display = derive_price_display(
            price_min_cents.map(|cents| cents as f64 / 100.0),
            price_max_cents.map(|cents| cents as f64 / 100.0),
        );

        Ok(Some(ProductMatch {
            external_id: format!("mock-{slug}"),
            title: query.trim().to_string(),
            image_url: None,
            price_display,
            product_url: format!("https://shop.invalid/p/{slug}"),
        }))
    }
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_dash = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Pick the configured HTTP provider, or the deterministic mock when no
/// base URL is set.
pub fn product_search_from_config(
    config: &ProductSearchConfig,
) -> Result<Arc<dyn ProductSearch>, ProductSearchError> {
    match &config.base_url {
        Some(base_url) if !base_url.trim().is_empty() => {
            let client =
                HttpProductSearch::new(base_url, config.api_key.clone(), config.timeout_secs)?;
            Ok(Arc::new(client))
        }
        _ => {
            info!(
                event_name = "products.mock_fallback",
                "no product-search provider configured; using deterministic mock"
            );
            Ok(Arc::new(MockProductSearch))
        }
    }
}
