//! Price history summary and trend classification

use crate::api::Quote;
use crate::error::{Result, StockError};
use serde::Serialize;
use std::fmt;
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Short moving average period (trading days)
pub const SMA_SHORT: usize = 20;
/// Long moving average period (trading days)
pub const SMA_LONG: usize = 50;
/// Window change, in percent, beyond which a move counts as a trend
pub const TREND_BAND_PCT: f64 = 2.0;

/// Direction of the price over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Sideways => "sideways",
        };
        f.write_str(label)
    }
}

/// Summary statistics over a price window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub data_points: usize,
    pub first_close: f64,
    pub last_close: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub trend: Trend,
}

/// Last value of a simple moving average, if the series is long enough
pub fn sma(closes: &[f64], period: usize) -> Result<Option<f64>> {
    if closes.len() < period {
        return Ok(None);
    }

    let mut indicator = SimpleMovingAverage::new(period)
        .map_err(|e| StockError::IndicatorError(format!("SMA({period}): {e}")))?;
    let mut last = None;
    for close in closes {
        last = Some(indicator.next(*close));
    }
    Ok(last)
}

/// Classify the trend from the window change and the moving averages
///
/// A change beyond ±[`TREND_BAND_PCT`] is a trend only when the short SMA
/// does not contradict it; without enough data for both SMAs the change
/// alone decides.
pub fn classify_trend(change_pct: f64, sma_short: Option<f64>, sma_long: Option<f64>) -> Trend {
    let cross = match (sma_short, sma_long) {
        (Some(short), Some(long)) => Some(short.partial_cmp(&long)),
        _ => None,
    };

    if change_pct > TREND_BAND_PCT {
        match cross {
            Some(Some(std::cmp::Ordering::Less)) => Trend::Sideways,
            _ => Trend::Up,
        }
    } else if change_pct < -TREND_BAND_PCT {
        match cross {
            Some(Some(std::cmp::Ordering::Greater)) => Trend::Sideways,
            _ => Trend::Down,
        }
    } else {
        Trend::Sideways
    }
}

/// Summarise a chronologically ordered series of quotes
pub fn summarize(symbol: &str, quotes: &[Quote]) -> Result<PriceSummary> {
    let (Some(first), Some(last)) = (quotes.first(), quotes.last()) else {
        return Err(StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "no quotes in the requested window".to_string(),
        });
    };
    if first.close <= 0.0 {
        return Err(StockError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("invalid first close {}", first.close),
        });
    }

    let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
    let high = quotes.iter().map(|q| q.high).fold(f64::MIN, f64::max);
    let low = quotes.iter().map(|q| q.low).fold(f64::MAX, f64::min);
    let change_pct = (last.close - first.close) / first.close * 100.0;

    let sma_20 = sma(&closes, SMA_SHORT)?;
    let sma_50 = sma(&closes, SMA_LONG)?;

    Ok(PriceSummary {
        data_points: quotes.len(),
        first_close: first.close,
        last_close: last.close,
        change_pct: round2(change_pct),
        high,
        low,
        sma_20: sma_20.map(round2),
        sma_50: sma_50.map(round2),
        trend: classify_trend(change_pct, sma_20, sma_50),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn series(closes: impl IntoIterator<Item = f64>) -> Vec<Quote> {
        let start = NaiveDate::from_ymd_opt(2023, 8, 8).unwrap();
        closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| Quote {
                timestamp: Utc.from_utc_datetime(
                    &(start + chrono::Days::new(i as u64)).and_hms_opt(0, 0, 0).unwrap(),
                ),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                adjclose: close,
                volume: 1_000,
            })
            .collect()
    }

    #[test]
    fn test_rising_series_is_up() {
        let quotes = series((0..60).map(|i| 100.0 + f64::from(i)));
        let summary = summarize("AAPL", &quotes).unwrap();

        assert_eq!(summary.trend, Trend::Up);
        assert_eq!(summary.data_points, 60);
        assert_eq!(summary.first_close, 100.0);
        assert_eq!(summary.last_close, 159.0);
        assert_eq!(summary.change_pct, 59.0);
        assert_eq!(summary.high, 160.0);
        assert_eq!(summary.low, 99.0);
        // mean of 140..=159
        assert_eq!(summary.sma_20, Some(149.5));
        assert_eq!(summary.sma_50, Some(134.5));
    }

    #[test]
    fn test_falling_series_is_down() {
        let quotes = series((0..60).map(|i| 200.0 - f64::from(i)));
        assert_eq!(summarize("TSLA", &quotes).unwrap().trend, Trend::Down);
    }

    #[test]
    fn test_flat_series_is_sideways() {
        let quotes = series((0..60).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }));
        let summary = summarize("KO", &quotes).unwrap();
        assert_eq!(summary.trend, Trend::Sideways);
        assert_eq!(summary.change_pct, 1.0);
    }

    #[test]
    fn test_sma_cross_can_veto_the_change() {
        assert_eq!(classify_trend(5.0, Some(90.0), Some(100.0)), Trend::Sideways);
        assert_eq!(classify_trend(-5.0, Some(110.0), Some(100.0)), Trend::Sideways);
        assert_eq!(classify_trend(5.0, None, None), Trend::Up);
        assert_eq!(classify_trend(-5.0, Some(90.0), None), Trend::Down);
        assert_eq!(classify_trend(2.0, Some(110.0), Some(100.0)), Trend::Sideways);
    }

    #[test]
    fn test_short_series_has_no_sma() {
        let quotes = series([10.0, 11.0, 12.0]);
        let summary = summarize("X", &quotes).unwrap();
        assert_eq!(summary.sma_20, None);
        assert_eq!(summary.sma_50, None);
        assert_eq!(summary.trend, Trend::Up);
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(matches!(
            summarize("NOPE", &[]),
            Err(StockError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::Up.to_string(), "up");
        assert_eq!(serde_json::to_value(Trend::Sideways).unwrap(), "sideways");
    }
}
