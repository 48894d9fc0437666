//! Market data for tradedesk
//!
//! This crate turns a volatile trading symbol into a price series:
//!
//! - [`SymbolResolver`] maps a symbol (plus optional display name) to a stable
//!   CoinGecko catalog id, memoizing every outcome, including misses, in an
//!   explicitly owned [`ResolutionCache`]
//! - [`RangeSeriesFetcher`] maps a [`RangeKey`] onto the fixed catalog query
//!   table and normalizes the returned `[time, price]` pairs
//! - [`PriceChartPanel`] is the per-view state that drives both and discards
//!   results of superseded requests
//!
//! # Example
//!
//! ```rust,ignore
//! use desk_market::{CoinGeckoClient, RangeKey, RangeSeriesFetcher, SymbolResolver};
//! use desk_utils::DeskConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = Arc::new(CoinGeckoClient::from_config(&DeskConfig::default())?);
//!     let resolver = SymbolResolver::new(api.clone());
//!     let fetcher = RangeSeriesFetcher::new(api);
//!
//!     if let Some(id) = resolver.resolve("SOL", Some("Solana")).await {
//!         let points = fetcher.fetch(&id, RangeKey::OneWeek).await?;
//!         println!("{} points", points.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod chart;
pub mod error;
pub mod range;
pub mod resolver;
pub mod series;

pub use api::{CatalogApi, CatalogCandidate, CoinGeckoClient};
pub use cache::{ResolutionCache, ResolutionEntry};
pub use chart::{ChartSnapshot, PriceChartPanel};
pub use error::{MarketError, Result};
pub use range::{DayCount, RangeKey, SeriesQuery};
pub use resolver::SymbolResolver;
pub use series::{Clock, RangeSeriesFetcher, SeriesPoint};
