//! CoinGecko v3 API client

use super::{CatalogApi, CatalogCandidate};
use crate::error::{MarketError, Result};
use crate::range::SeriesQuery;
use async_trait::async_trait;
use desk_utils::DeskConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<CatalogCandidate>,
}

/// CoinGecko client for search and market_chart endpoints
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    vs_currency: String,
    rate_limiter: SharedRateLimiter,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client with rate limiting
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.coingecko.com/api/v3`
    /// * `vs_currency` - Quote currency for price series
    /// * `rate_limit` - Requests per minute (public tier: ~30)
    pub fn new(base_url: impl Into<String>, vs_currency: impl Into<String>, rate_limit: u32) -> Self {
        Self::with_client(Client::new(), base_url, vs_currency, rate_limit)
    }

    /// Client against the public API with default limits
    pub fn public() -> Self {
        Self::new(DEFAULT_BASE_URL, "usd", 30)
    }

    /// Build from the shared desk configuration
    pub fn from_config(config: &DeskConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(
            client,
            config.catalog_base(),
            config.vs_currency.clone(),
            config.catalog_rate_limit,
        ))
    }

    fn with_client(
        client: Client,
        base_url: impl Into<String>,
        vs_currency: impl Into<String>,
        rate_limit: u32,
    ) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let base_url: String = base_url.into();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            vs_currency: vs_currency.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)], failure: &str) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, ?params, "catalog request");

        let response = self.client.get(&url).query(params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MarketError::Api(format!("{failure} (HTTP {})", status.as_u16())));
        }

        Ok(response.json::<serde_json::Value>().await?)
    }
}

#[async_trait]
impl CatalogApi for CoinGeckoClient {
    async fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>> {
        let data = self
            .get_json("/search", &[("query", query.to_string())], "Search failed")
            .await?;
        let parsed: SearchResponse = serde_json::from_value(data)?;
        Ok(parsed.coins)
    }

    async fn market_chart(&self, catalog_id: &str, query: SeriesQuery) -> Result<serde_json::Value> {
        let (path, params) = query.to_request(catalog_id, &self.vs_currency);
        self.get_json(&path, &params, "Failed to fetch market data").await
    }
}
