//! Symbol → catalog id resolution

use crate::api::{CatalogApi, CatalogCandidate};
use crate::cache::{ResolutionCache, ResolutionEntry};
use std::sync::Arc;
use tracing::{debug, warn};

/// Well-known symbols whose catalog ids never need a lookup
pub fn manual_catalog_id(symbol_key: &str) -> Option<&'static str> {
    match symbol_key {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "XRP" => Some("ripple"),
        "ADA" => Some("cardano"),
        "DOGE" => Some("dogecoin"),
        "BNB" => Some("binancecoin"),
        "AVAX" => Some("avalanche-2"),
        "DOT" => Some("polkadot"),
        "TRX" => Some("tron"),
        _ => None,
    }
}

/// Pick the catalog id among search candidates
///
/// Prefers the candidate whose symbol matches case-insensitively, otherwise
/// the first candidate.
pub fn pick_candidate(symbol_key: &str, candidates: &[CatalogCandidate]) -> Option<String> {
    let usable = |id: &Option<String>| id.as_ref().filter(|id| !id.trim().is_empty()).cloned();

    let exact = candidates
        .iter()
        .find(|c| {
            c.symbol
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(symbol_key))
        })
        .and_then(|c| usable(&c.id));

    exact.or_else(|| candidates.first().and_then(|c| usable(&c.id)))
}

/// Memoizing resolver from trading symbols to catalog ids
///
/// Each distinct symbol costs at most one catalog search for the lifetime of
/// the cache, whether or not the search produced an id. Failures degrade to
/// `None` and are cached like any other outcome.
#[derive(Clone)]
pub struct SymbolResolver {
    api: Arc<dyn CatalogApi>,
    cache: ResolutionCache,
}

impl SymbolResolver {
    /// Create a resolver with its own empty cache
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self::with_cache(api, ResolutionCache::new())
    }

    /// Create a resolver over an existing cache
    pub fn with_cache(api: Arc<dyn CatalogApi>, cache: ResolutionCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Memoized entry for `symbol`, without any lookup
    pub async fn cached(&self, symbol: &str) -> Option<ResolutionEntry> {
        let key = ResolutionCache::key_for(symbol)?;
        self.cache.get(&key).await
    }

    /// Number of memoized symbols
    pub async fn len(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.is_empty().await
    }

    /// Resolve `symbol` to a catalog id
    ///
    /// `display_name`, when given and non-blank, is used as the search query
    /// instead of the symbol.
    pub async fn resolve(&self, symbol: &str, display_name: Option<&str>) -> Option<String> {
        let key = ResolutionCache::key_for(symbol)?;

        if let Some(id) = manual_catalog_id(&key) {
            debug!(symbol = %key, id, "manual catalog mapping");
            let stored = self.cache.insert_if_absent(&key, Some(id.to_string())).await;
            if stored.catalog_id.as_deref() != Some(id) {
                debug!(symbol = %key, cached = ?stored.catalog_id, "manual mapping overrides memoized entry");
            }
            return Some(id.to_string());
        }

        if let Some(entry) = self.cache.get(&key).await {
            debug!(symbol = %key, catalog_id = ?entry.catalog_id, "resolution cache hit");
            return entry.catalog_id;
        }

        debug!(symbol = %key, "resolution cache miss");

        let query = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(symbol.trim());

        let found = match self.api.search(query).await {
            Ok(candidates) => pick_candidate(&key, &candidates),
            Err(e) => {
                warn!(symbol = %key, error = %e, "catalog search failed, caching as unresolved");
                None
            },
        };

        self.cache.insert_if_absent(&key, found).await.catalog_id
    }
}
