//! Catalog API seam and the CoinGecko client

pub mod coingecko;

pub use coingecko::CoinGeckoClient;

use crate::error::Result;
use crate::range::SeriesQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    /// Stable catalog id, e.g. "avalanche-2"
    #[serde(default)]
    pub id: Option<String>,
    /// Trading symbol as reported by the catalog
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CatalogCandidate {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            symbol: Some(symbol.into()),
            name: None,
        }
    }
}

/// Remote market-data catalog
///
/// Implementations only perform transport and decoding; memoization and
/// normalization live in [`crate::SymbolResolver`] and
/// [`crate::RangeSeriesFetcher`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Free-text search over the catalog
    async fn search(&self, query: &str) -> Result<Vec<CatalogCandidate>>;

    /// Raw series payload (`{"prices": [[ms, price], ...], ...}`) for a catalog id
    async fn market_chart(&self, catalog_id: &str, query: SeriesQuery) -> Result<serde_json::Value>;
}
