//! Memo table for symbol resolution

use cached::{Cached, UnboundCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of one resolution attempt
///
/// `catalog_id: None` is a real, cached answer ("unresolvable"), not a miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionEntry {
    /// Upper-cased trading symbol
    pub symbol_key: String,
    pub catalog_id: Option<String>,
}

/// Append-only, process-lifetime resolution cache
///
/// Entries are never mutated or evicted once written: the first outcome
/// recorded for a key wins. Cloning shares the underlying table.
#[derive(Clone)]
pub struct ResolutionCache {
    entries: Arc<RwLock<UnboundCache<String, Option<String>>>>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(UnboundCache::new())),
        }
    }

    /// Cache key for a raw symbol; `None` for blank input
    pub fn key_for(symbol: &str) -> Option<String> {
        let key = symbol.trim().to_uppercase();
        (!key.is_empty()).then_some(key)
    }

    /// Look up a memoized entry
    pub async fn get(&self, symbol_key: &str) -> Option<ResolutionEntry> {
        let mut entries = self.entries.write().await;
        entries
            .cache_get(&symbol_key.to_string())
            .map(|catalog_id| ResolutionEntry {
                symbol_key: symbol_key.to_string(),
                catalog_id: catalog_id.clone(),
            })
    }

    /// Record an outcome unless one already exists; returns the stored entry
    pub async fn insert_if_absent(&self, symbol_key: &str, catalog_id: Option<String>) -> ResolutionEntry {
        let mut entries = self.entries.write().await;
        let stored = entries
            .cache_get_or_set_with(symbol_key.to_string(), || catalog_id)
            .clone();
        ResolutionEntry {
            symbol_key: symbol_key.to_string(),
            catalog_id: stored,
        }
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(ResolutionCache::key_for(" btc "), Some("BTC".to_string()));
        assert_eq!(ResolutionCache::key_for(""), None);
        assert_eq!(ResolutionCache::key_for("   "), None);
    }

    #[tokio::test]
    async fn test_negative_entries_are_hits() {
        let cache = ResolutionCache::new();
        assert!(cache.get("ZZZ9").await.is_none());

        cache.insert_if_absent("ZZZ9", None).await;

        let entry = cache.get("ZZZ9").await.unwrap();
        assert_eq!(entry.symbol_key, "ZZZ9");
        assert_eq!(entry.catalog_id, None);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let cache = ResolutionCache::new();
        cache.insert_if_absent("PEPE", Some("pepe".to_string())).await;
        let entry = cache.insert_if_absent("PEPE", None).await;

        assert_eq!(entry.catalog_id.as_deref(), Some("pepe"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = ResolutionCache::new();
        let shared = cache.clone();
        cache.insert_if_absent("ETH", Some("ethereum".to_string())).await;

        assert!(!shared.is_empty().await);
        assert_eq!(
            shared.get("ETH").await.and_then(|e| e.catalog_id).as_deref(),
            Some("ethereum")
        );
    }
}
