//! Time-ranged price series

use crate::api::CatalogApi;
use crate::error::{MarketError, Result};
use crate::range::RangeKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Source of "now" in epoch seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// One price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Epoch milliseconds
    pub time: i64,
    pub price: f64,
}

/// Extract the `prices` array of a market_chart payload
///
/// Order is kept as delivered. Consecutive points sharing a timestamp are
/// collapsed to the later one.
pub fn normalize_prices(payload: &serde_json::Value) -> Result<Vec<SeriesPoint>> {
    let prices = payload
        .get("prices")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| MarketError::MalformedPayload("missing 'prices' array".to_string()))?;

    let mut points: Vec<SeriesPoint> = Vec::with_capacity(prices.len());
    for (i, pair) in prices.iter().enumerate() {
        let (time, price) = match pair.as_array().map(Vec::as_slice) {
            Some([time, price, ..]) => (time.as_f64(), price.as_f64()),
            _ => (None, None),
        };
        let (Some(time), Some(price)) = (time, price) else {
            return Err(MarketError::MalformedPayload(format!(
                "entry {i} is not a [time, price] pair: {pair}"
            )));
        };

        let point = SeriesPoint {
            time: time as i64,
            price,
        };
        match points.last_mut() {
            Some(last) if last.time == point.time => *last = point,
            _ => points.push(point),
        }
    }

    Ok(points)
}

/// Fetches normalized price series for resolved catalog ids
///
/// Stateless: every `(catalog_id, range)` request goes to the network.
#[derive(Clone)]
pub struct RangeSeriesFetcher {
    api: Arc<dyn CatalogApi>,
    clock: Clock,
}

impl RangeSeriesFetcher {
    /// Create a fetcher using the system clock
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            clock: system_clock(),
        }
    }

    /// Replace the clock used for rolling windows
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch the series of `catalog_id` for `range`
    pub async fn fetch(&self, catalog_id: &str, range: RangeKey) -> Result<Vec<SeriesPoint>> {
        let catalog_id = catalog_id.trim();
        if catalog_id.is_empty()
            || catalog_id
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
        {
            return Err(MarketError::InvalidCatalogId(catalog_id.to_string()));
        }

        let query = range.query((self.clock)());
        debug!(catalog_id, %range, ?query, "fetching price series");

        let payload = self.api.market_chart(catalog_id, query).await?;
        let points = normalize_prices(&payload)?;

        debug!(catalog_id, %range, points = points.len(), "price series fetched");
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockCatalogApi;
    use crate::range::{DayCount, SeriesQuery};
    use mockall::predicate::eq;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn fetcher(mock: MockCatalogApi) -> RangeSeriesFetcher {
        RangeSeriesFetcher::new(Arc::new(mock)).with_clock(Arc::new(|| NOW))
    }

    #[tokio::test]
    async fn test_each_range_issues_its_query() {
        for range in RangeKey::all() {
            let expected = match range {
                RangeKey::OneHour => SeriesQuery::Window { from: NOW - 3600, to: NOW },
                RangeKey::OneDay => SeriesQuery::Days(DayCount::Count(1)),
                RangeKey::OneWeek => SeriesQuery::Days(DayCount::Count(7)),
                RangeKey::OneMonth => SeriesQuery::Days(DayCount::Count(30)),
                RangeKey::OneYear => SeriesQuery::Days(DayCount::Count(365)),
                RangeKey::All => SeriesQuery::Days(DayCount::Max),
            };

            let mut mock = MockCatalogApi::new();
            mock.expect_market_chart()
                .with(eq("bitcoin"), eq(expected))
                .times(1)
                .returning(|_, _| Ok(json!({"prices": [[1000, 1.0]]})));

            let points = fetcher(mock).fetch("bitcoin", *range).await.unwrap();
            assert_eq!(points.len(), 1, "{range}");
        }
    }

    #[tokio::test]
    async fn test_points_keep_upstream_order() {
        let mut mock = MockCatalogApi::new();
        mock.expect_market_chart().returning(|_, _| {
            Ok(json!({
                "prices": [[1_000.0, 10.5], [2_000, 11.0], [3_000, 9.25]],
                "market_caps": []
            }))
        });

        let points = fetcher(mock).fetch("solana", RangeKey::OneDay).await.unwrap();
        assert_eq!(
            points,
            vec![
                SeriesPoint { time: 1_000, price: 10.5 },
                SeriesPoint { time: 2_000, price: 11.0 },
                SeriesPoint { time: 3_000, price: 9.25 },
            ]
        );
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let mut mock = MockCatalogApi::new();
        mock.expect_market_chart()
            .returning(|_, _| Err(MarketError::Api("Failed to fetch market data (HTTP 429)".to_string())));

        let err = fetcher(mock).fetch("bitcoin", RangeKey::All).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch market data (HTTP 429)");
    }

    #[tokio::test]
    async fn test_invalid_catalog_id_skips_network() {
        let mut mock = MockCatalogApi::new();
        mock.expect_market_chart().never();
        let fetcher = fetcher(mock);

        for id in ["", "  ", "a/b", "bit coin"] {
            let err = fetcher.fetch(id, RangeKey::OneYear).await.unwrap_err();
            assert!(matches!(err, MarketError::InvalidCatalogId(_)), "{id:?}");
        }
    }

    #[test]
    fn test_normalize_rejects_malformed_payloads() {
        assert!(normalize_prices(&json!({})).is_err());
        assert!(normalize_prices(&json!({"prices": "nope"})).is_err());
        assert!(normalize_prices(&json!({"prices": [[1, "x"]]})).is_err());
        assert!(normalize_prices(&json!({"prices": [[1]]})).is_err());
        assert!(normalize_prices(&json!({"prices": []})).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_collapses_duplicate_timestamps() {
        let points = normalize_prices(&json!({"prices": [[1, 1.0], [2, 2.0], [2, 2.5], [3, 3.0]]})).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], SeriesPoint { time: 2, price: 2.5 });
    }
}
