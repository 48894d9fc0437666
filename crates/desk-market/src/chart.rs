//! Price chart panel state
//!
//! Drives the resolver and the series fetcher for one chart view. Symbol
//! resolutions and series fetches are tagged with separate generations:
//! choosing a symbol supersedes both, choosing a range supersedes only the
//! fetch. A slow response for a previous symbol or range never overwrites the
//! current one, and a range picked while the symbol is still resolving is
//! loaded once the resolution lands.

use crate::range::RangeKey;
use crate::resolver::SymbolResolver;
use crate::series::{RangeSeriesFetcher, SeriesPoint};
use desk_core::{Generation, GenerationCounter};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Error shown when a symbol has no catalog id
pub const UNAVAILABLE_MESSAGE: &str = "Coin data unavailable on CoinGecko.";

/// Renderable state of a chart panel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub symbol: String,
    pub catalog_id: Option<String>,
    pub range: RangeKey,
    pub points: Vec<SeriesPoint>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ChartSnapshot {
    /// Axis labels for the current points
    pub fn labels(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| self.range.format_label(p.time))
            .collect()
    }
}

/// One series fetch in flight
struct FetchTarget {
    generation: Generation,
    catalog_id: String,
    range: RangeKey,
}

/// State holder for one price chart view
pub struct PriceChartPanel {
    resolver: Arc<SymbolResolver>,
    fetcher: Arc<RangeSeriesFetcher>,
    resolutions: GenerationCounter,
    fetches: GenerationCounter,
    state: Mutex<ChartSnapshot>,
}

impl PriceChartPanel {
    pub fn new(resolver: Arc<SymbolResolver>, fetcher: Arc<RangeSeriesFetcher>) -> Self {
        Self {
            resolver,
            fetcher,
            resolutions: GenerationCounter::new(),
            fetches: GenerationCounter::new(),
            state: Mutex::new(ChartSnapshot::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChartSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` only if `generation` is still current on `counter`
    fn commit<T>(
        &self,
        counter: &GenerationCounter,
        generation: Generation,
        f: impl FnOnce(&mut ChartSnapshot) -> T,
    ) -> Option<T> {
        let mut state = self.state();
        if !counter.is_current(generation) {
            debug!(%generation, "dropping stale chart result");
            return None;
        }
        Some(f(&mut state))
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        self.state().clone()
    }

    /// Show `symbol`, resolving it and loading the current range
    pub async fn select_symbol(&self, symbol: &str, name: Option<&str>) {
        let generation = {
            let mut state = self.state();
            let generation = self.resolutions.advance();
            self.fetches.advance();
            state.symbol = symbol.trim().to_uppercase();
            state.catalog_id = None;
            state.points.clear();
            state.error = None;
            state.loading = false;
            generation
        };

        if symbol.trim().is_empty() {
            return;
        }

        let resolved = self.resolver.resolve(symbol, name).await;
        let target = self
            .commit(&self.resolutions, generation, |state| match resolved {
                Some(id) => {
                    state.catalog_id = Some(id);
                    self.begin_fetch(state)
                },
                None => {
                    state.error = Some(UNAVAILABLE_MESSAGE.to_string());
                    None
                },
            })
            .flatten();

        if let Some(target) = target {
            self.load(target).await;
        }
    }

    /// Switch to `range`, refetching when a catalog id is known
    ///
    /// Without an id yet, the range is only recorded; a pending resolution
    /// loads it when it completes.
    pub async fn select_range(&self, range: RangeKey) {
        let target = {
            let mut state = self.state();
            state.range = range;
            self.begin_fetch(&mut state)
        };

        if let Some(target) = target {
            self.load(target).await;
        }
    }

    /// Supersede any fetch in flight and mark the panel loading
    fn begin_fetch(&self, state: &mut ChartSnapshot) -> Option<FetchTarget> {
        let generation = self.fetches.advance();
        let catalog_id = state.catalog_id.clone()?;
        state.loading = true;
        state.error = None;
        state.points.clear();
        Some(FetchTarget {
            generation,
            catalog_id,
            range: state.range,
        })
    }

    async fn load(&self, target: FetchTarget) {
        let FetchTarget {
            generation,
            catalog_id,
            range,
        } = target;
        let result = self.fetcher.fetch(&catalog_id, range).await;

        self.commit(&self.fetches, generation, |state| {
            state.loading = false;
            match result {
                Ok(points) => state.points = points,
                Err(e) => {
                    warn!(%catalog_id, %range, error = %e, "price series fetch failed");
                    state.points.clear();
                    state.error = Some(e.to_string());
                },
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CatalogCandidate, MockCatalogApi};
    use crate::error::MarketError;
    use crate::range::SeriesQuery;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn panel(mock: MockCatalogApi) -> PriceChartPanel {
        let api: Arc<dyn crate::CatalogApi> = Arc::new(mock);
        PriceChartPanel::new(
            Arc::new(SymbolResolver::new(api.clone())),
            Arc::new(RangeSeriesFetcher::new(api).with_clock(Arc::new(|| 1_700_000_000))),
        )
    }

    #[tokio::test]
    async fn test_select_symbol_loads_default_range() {
        let mut mock = MockCatalogApi::new();
        mock.expect_search().never();
        mock.expect_market_chart()
            .withf(|id, query| id == "bitcoin" && *query == RangeKey::OneYear.query(1_700_000_000))
            .times(1)
            .returning(|_, _| Ok(json!({"prices": [[1_000, 30_000.0], [2_000, 31_000.0]]})));
        let panel = panel(mock);

        panel.select_symbol("btc", Some("Bitcoin")).await;

        let snap = panel.snapshot();
        assert_eq!(snap.symbol, "BTC");
        assert_eq!(snap.catalog_id.as_deref(), Some("bitcoin"));
        assert_eq!(snap.points.len(), 2);
        assert!(!snap.loading);
        assert!(snap.error.is_none());
        assert_eq!(snap.labels().len(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_symbol_sets_error() {
        let mut mock = MockCatalogApi::new();
        mock.expect_search().times(1).returning(|_| Ok(vec![]));
        mock.expect_market_chart().never();
        let panel = panel(mock);

        panel.select_symbol("ZZZ9", None).await;

        let snap = panel.snapshot();
        assert!(snap.catalog_id.is_none());
        assert!(snap.points.is_empty());
        assert_eq!(snap.error.as_deref(), Some(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_fetch_error_clears_previous_series() {
        let mut mock = MockCatalogApi::new();
        mock.expect_search()
            .returning(|_| Ok(vec![CatalogCandidate::new("chainlink", "LINK")]));
        mock.expect_market_chart()
            .withf(|_, query| matches!(query, SeriesQuery::Days(_)))
            .returning(|_, _| Ok(json!({"prices": [[1_000, 7.0]]})));
        mock.expect_market_chart()
            .withf(|_, query| matches!(query, SeriesQuery::Window { .. }))
            .returning(|_, _| Err(MarketError::Api("Failed to fetch market data (HTTP 500)".to_string())));
        let panel = panel(mock);

        panel.select_symbol("LINK", None).await;
        assert_eq!(panel.snapshot().points.len(), 1);

        panel.select_range(RangeKey::OneHour).await;
        let snap = panel.snapshot();
        assert_eq!(snap.range, RangeKey::OneHour);
        assert!(snap.points.is_empty());
        assert_eq!(snap.error.as_deref(), Some("Failed to fetch market data (HTTP 500)"));
    }

    #[tokio::test]
    async fn test_range_change_without_symbol_is_noop() {
        let mut mock = MockCatalogApi::new();
        mock.expect_market_chart().never();
        let panel = panel(mock);

        panel.select_range(RangeKey::OneWeek).await;
        let snap = panel.snapshot();
        assert_eq!(snap.range, RangeKey::OneWeek);
        assert!(!snap.loading);
    }

    /// Catalog whose first search and first series fetch wait for a gate
    struct GatedApi {
        search_gate: Arc<Notify>,
        chart_gate: Arc<Notify>,
        entered: Arc<Notify>,
        gate_search: bool,
        charts: AtomicUsize,
        queries: Mutex<Vec<(String, SeriesQuery)>>,
    }

    impl GatedApi {
        fn new(gate_search: bool) -> Self {
            Self {
                search_gate: Arc::new(Notify::new()),
                chart_gate: Arc::new(Notify::new()),
                entered: Arc::new(Notify::new()),
                gate_search,
                charts: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl crate::CatalogApi for GatedApi {
        async fn search(&self, query: &str) -> crate::Result<Vec<CatalogCandidate>> {
            self.entered.notify_one();
            if self.gate_search {
                self.search_gate.notified().await;
            }
            Ok(vec![CatalogCandidate::new(format!("{}-coin", query.to_lowercase()), query)])
        }

        async fn market_chart(&self, catalog_id: &str, query: SeriesQuery) -> crate::Result<serde_json::Value> {
            let call = self.charts.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push((catalog_id.to_string(), query));
            if call == 0 && !self.gate_search {
                self.entered.notify_one();
                self.chart_gate.notified().await;
            }
            let price = f64::from(u32::try_from(call).unwrap() + 1) * 10.0;
            Ok(json!({"prices": [[1_000, price]]}))
        }
    }

    fn gated_panel(api: &Arc<GatedApi>) -> Arc<PriceChartPanel> {
        let api: Arc<dyn crate::CatalogApi> = api.clone();
        Arc::new(PriceChartPanel::new(
            Arc::new(SymbolResolver::new(api.clone())),
            Arc::new(RangeSeriesFetcher::new(api).with_clock(Arc::new(|| 1_700_000_000))),
        ))
    }

    #[tokio::test]
    async fn test_range_change_during_resolution_still_loads() {
        let api = Arc::new(GatedApi::new(true));
        let panel = gated_panel(&api);

        let pending = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.select_symbol("LINK", None).await })
        };
        api.entered.notified().await;

        panel.select_range(RangeKey::OneWeek).await;
        assert_eq!(panel.snapshot().range, RangeKey::OneWeek);
        assert!(panel.snapshot().catalog_id.is_none());

        api.search_gate.notify_one();
        pending.await.unwrap();

        let snap = panel.snapshot();
        assert_eq!(snap.catalog_id.as_deref(), Some("link-coin"));
        assert_eq!(snap.range, RangeKey::OneWeek);
        assert_eq!(snap.points.len(), 1);
        assert!(!snap.loading);
        assert!(snap.error.is_none());

        let queries = api.queries.lock().unwrap().clone();
        assert_eq!(queries, vec![("link-coin".to_string(), RangeKey::OneWeek.query(1_700_000_000))]);
    }

    #[tokio::test]
    async fn test_resolution_superseded_by_new_symbol_is_dropped() {
        let api = Arc::new(GatedApi::new(true));
        let panel = gated_panel(&api);

        let pending = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.select_symbol("LINK", None).await })
        };
        api.entered.notified().await;

        panel.select_symbol("BTC", None).await;
        api.search_gate.notify_one();
        pending.await.unwrap();

        let snap = panel.snapshot();
        assert_eq!(snap.symbol, "BTC");
        assert_eq!(snap.catalog_id.as_deref(), Some("bitcoin"));
        assert_eq!(snap.points.len(), 1);
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn test_slow_fetch_superseded_by_range_is_dropped() {
        let api = Arc::new(GatedApi::new(false));
        let panel = gated_panel(&api);

        let pending = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.select_symbol("BTC", None).await })
        };
        api.entered.notified().await;
        assert!(panel.snapshot().loading);

        panel.select_range(RangeKey::OneWeek).await;
        assert_eq!(panel.snapshot().points, vec![SeriesPoint { time: 1_000, price: 20.0 }]);

        api.chart_gate.notify_one();
        pending.await.unwrap();

        let snap = panel.snapshot();
        assert_eq!(snap.range, RangeKey::OneWeek);
        assert_eq!(snap.points, vec![SeriesPoint { time: 1_000, price: 20.0 }]);
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn test_slow_fetch_superseded_by_symbol_is_dropped() {
        let api = Arc::new(GatedApi::new(false));
        let panel = gated_panel(&api);

        let pending = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.select_symbol("BTC", None).await })
        };
        api.entered.notified().await;

        panel.select_symbol("ETH", None).await;
        api.chart_gate.notify_one();
        pending.await.unwrap();

        let snap = panel.snapshot();
        assert_eq!(snap.symbol, "ETH");
        assert_eq!(snap.catalog_id.as_deref(), Some("ethereum"));
        assert_eq!(snap.points, vec![SeriesPoint { time: 1_000, price: 20.0 }]);
        assert!(!snap.loading);
    }
}
