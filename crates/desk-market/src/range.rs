//! Chart ranges and the catalog queries they map to
//!
//! The mapping from [`RangeKey`] to [`SeriesQuery`] decides which catalog
//! endpoint is hit and with which parameters, so it is fixed:
//!
//! | range | query |
//! |-------|-------|
//! | 1H | rolling window `from = now - 3600`, `to = now` |
//! | 1D / 1W / 1M / 1Y | `days` = 1 / 7 / 30 / 365, daily interval |
//! | ALL | `days = max`, daily interval |

use crate::error::MarketError;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the rolling window used for [`RangeKey::OneHour`], in seconds
pub const ONE_HOUR_WINDOW_SECS: i64 = 60 * 60;

/// Requested chart range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RangeKey {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[default]
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl RangeKey {
    /// All ranges in display order
    pub fn all() -> &'static [RangeKey] {
        &[
            RangeKey::OneHour,
            RangeKey::OneDay,
            RangeKey::OneWeek,
            RangeKey::OneMonth,
            RangeKey::OneYear,
            RangeKey::All,
        ]
    }

    /// Short label used on the range selector
    pub fn label(self) -> &'static str {
        match self {
            RangeKey::OneHour => "1H",
            RangeKey::OneDay => "1D",
            RangeKey::OneWeek => "1W",
            RangeKey::OneMonth => "1M",
            RangeKey::OneYear => "1Y",
            RangeKey::All => "ALL",
        }
    }

    /// Catalog query for this range, with `now` in epoch seconds
    pub fn query(self, now: i64) -> SeriesQuery {
        match self {
            RangeKey::OneHour => SeriesQuery::Window {
                from: now - ONE_HOUR_WINDOW_SECS,
                to: now,
            },
            RangeKey::OneDay => SeriesQuery::Days(DayCount::Count(1)),
            RangeKey::OneWeek => SeriesQuery::Days(DayCount::Count(7)),
            RangeKey::OneMonth => SeriesQuery::Days(DayCount::Count(30)),
            RangeKey::OneYear => SeriesQuery::Days(DayCount::Count(365)),
            RangeKey::All => SeriesQuery::Days(DayCount::Max),
        }
    }

    /// Axis label for a point at `time_ms`, in UTC
    ///
    /// Intraday ranges show clock time, longer ranges show dates.
    pub fn format_label(self, time_ms: i64) -> String {
        let Some(time) = DateTime::from_timestamp_millis(time_ms) else {
            return String::new();
        };
        let pattern = match self {
            RangeKey::OneHour => "%H:%M",
            RangeKey::OneDay => "%H",
            RangeKey::OneWeek => "%a",
            RangeKey::OneMonth | RangeKey::OneYear => "%b %-d",
            RangeKey::All => "%b %Y",
        };
        time.format(pattern).to_string()
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RangeKey {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RangeKey::all()
            .iter()
            .copied()
            .find(|range| range.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MarketError::InvalidRange(s.to_string()))
    }
}

/// Day-count argument of a `days` query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCount {
    Count(u32),
    /// Full available history
    Max,
}

impl fmt::Display for DayCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayCount::Count(days) => write!(f, "{days}"),
            DayCount::Max => f.write_str("max"),
        }
    }
}

/// Query shape understood by the catalog series endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesQuery {
    /// `market_chart?days=..&interval=daily`
    Days(DayCount),
    /// `market_chart/range?from=..&to=..`, epoch seconds
    Window { from: i64, to: i64 },
}

impl SeriesQuery {
    /// Endpoint path (relative to the catalog base) and query parameters
    pub fn to_request(&self, catalog_id: &str, vs_currency: &str) -> (String, Vec<(&'static str, String)>) {
        match self {
            SeriesQuery::Days(days) => (
                format!("/coins/{catalog_id}/market_chart"),
                vec![
                    ("vs_currency", vs_currency.to_string()),
                    ("days", days.to_string()),
                    ("interval", "daily".to_string()),
                ],
            ),
            SeriesQuery::Window { from, to } => (
                format!("/coins/{catalog_id}/market_chart/range"),
                vec![
                    ("vs_currency", vs_currency.to_string()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            ),
        }
    }
}
