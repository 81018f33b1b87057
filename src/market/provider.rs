//! Price provider seam for connecting to historical data sources.
//!
//! The engine never fetches prices itself; a host application supplies an
//! implementation backed by its own price cache or vendor feed.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::collections::HashMap;

use super::object::{PriceBar, PriceSeries};
use crate::error::{EngineError, Result};

/// Abstract provider of daily historical prices.
///
/// Implementations may return partial coverage per ticker; the engine
/// tolerates gaps without failing the whole request. Reads must be safe to
/// issue concurrently.
pub trait PriceProvider: Send + Sync {
    /// Ordered daily series for a ticker over an inclusive date range.
    fn daily_series(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries>;
}

/// In-memory provider over preloaded bars.
///
/// Used in tests and by hosts that have already fetched prices into memory.
#[derive(Debug, Default)]
pub struct MemoryPriceProvider {
    data: HashMap<String, BTreeMap<NaiveDate, PriceBar>>,
}

impl MemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bars, replacing any existing bar on the same (ticker, date).
    pub fn load_bars(&mut self, bars: Vec<PriceBar>) {
        for bar in bars {
            self.data
                .entry(bar.ticker.clone())
                .or_default()
                .insert(bar.date, bar);
        }
    }

    /// Convenience loader from (date, close) pairs.
    pub fn load_closes(&mut self, ticker: &str, closes: &[(NaiveDate, f64)]) {
        self.load_bars(
            closes
                .iter()
                .map(|(date, close)| PriceBar::new(ticker, *date, *close))
                .collect(),
        );
    }

    /// Tickers currently loaded.
    pub fn tickers(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

impl PriceProvider for MemoryPriceProvider {
    fn daily_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        let bars = self
            .data
            .get(ticker)
            .ok_or_else(|| {
                EngineError::input_validation(format!("no price data loaded for {}", ticker))
            })?
            .range(start..=end)
            .map(|(_, bar)| bar.clone())
            .collect();

        Ok(PriceSeries::new(ticker, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_memory_provider_range() {
        let mut provider = MemoryPriceProvider::new();
        provider.load_closes(
            "SPY",
            &[
                (date(2020, 1, 2), 100.0),
                (date(2020, 1, 3), 101.0),
                (date(2020, 2, 3), 105.0),
            ],
        );

        let series = provider
            .daily_series("SPY", date(2020, 1, 1), date(2020, 1, 31))
            .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_memory_provider_unknown_ticker() {
        let provider = MemoryPriceProvider::new();
        let result = provider.daily_series("MISSING", date(2020, 1, 1), date(2020, 1, 31));
        assert!(result.is_err());
    }
}
