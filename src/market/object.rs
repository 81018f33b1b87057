//! Basic data structures shared by the analytics components.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::constant::TradeAction;
use crate::error::{EngineError, Result};

/// Tolerance for a valid allocation's weight sum around 100%.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.1;

/// Coverage ratio below which a partial-coverage warning is recorded.
pub const COVERAGE_THRESHOLD: f64 = 0.8;

/// One daily price observation for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Create a new PriceBar with equal close and adjusted close.
    pub fn new(ticker: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            close,
            adjusted_close: close,
            volume: 0.0,
        }
    }

    /// Price used for simulation: adjusted close when available.
    pub fn price(&self) -> f64 {
        if self.adjusted_close > 0.0 {
            self.adjusted_close
        } else {
            self.close
        }
    }
}

/// Ordered daily price series for one ticker.
///
/// Bars are sorted by date with duplicates removed on construction; coverage
/// may be sparse relative to the full trading calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars, sorting by date and dropping duplicate dates.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Bars in date order.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True when the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Price on an exact date, if observed and positive.
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|idx| self.bars[idx].price())
            .filter(|p| *p > 0.0)
    }

    /// All observed dates within an inclusive range.
    pub fn dates_in(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .map(|b| b.date)
            .collect()
    }

    /// Restrict the series to an inclusive date range.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect(),
        }
    }
}

/// Target weight for one ticker, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAllocation {
    pub ticker: String,
    pub weight: f64,
}

impl PortfolioAllocation {
    pub fn new(ticker: impl Into<String>, weight: f64) -> Self {
        Self {
            ticker: ticker.into(),
            weight,
        }
    }
}

/// Validate an allocation set: non-empty, unique tickers, positive weights
/// summing to 100 within [`WEIGHT_SUM_TOLERANCE`].
pub fn validate_allocations(allocations: &[PortfolioAllocation]) -> Result<()> {
    if allocations.is_empty() {
        return Err(EngineError::input_validation("allocation list is empty"));
    }

    let mut seen = HashSet::new();
    for alloc in allocations {
        if alloc.ticker.trim().is_empty() {
            return Err(EngineError::input_validation("allocation has empty ticker"));
        }
        if !seen.insert(alloc.ticker.as_str()) {
            return Err(EngineError::input_validation(format!(
                "duplicate ticker in allocation: {}",
                alloc.ticker
            )));
        }
        if alloc.weight <= 0.0 || !alloc.weight.is_finite() {
            return Err(EngineError::input_validation(format!(
                "weight for {} must be a positive number",
                alloc.ticker
            )));
        }
    }

    let total: f64 = allocations.iter().map(|a| a.weight).sum();
    if (total - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(EngineError::input_validation(format!(
            "allocation weights must sum to 100, got {:.2}",
            total
        )));
    }

    Ok(())
}

/// Share count held for one ticker during a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub shares: u64,
}

/// Immutable trade ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    pub action: TradeAction,
    pub shares: u64,
    pub price: f64,
}

/// Portfolio value on one trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub total_value: f64,
}

impl PortfolioSnapshot {
    pub fn new(date: NaiveDate, total_value: f64) -> Self {
        Self { date, total_value }
    }
}

/// Data-completeness warning embedded in otherwise successful results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataWarning {
    pub ticker: String,
    pub observed_days: usize,
    pub expected_days: usize,
    pub message: String,
}

impl DataWarning {
    /// Warning for a ticker whose observed trading-day count falls short of
    /// the calendar's expected count.
    pub fn partial_coverage(ticker: impl Into<String>, observed: usize, expected: usize) -> Self {
        let ticker = ticker.into();
        let message = format!(
            "{} covers {} of {} trading days in range",
            ticker, observed, expected
        );
        Self {
            ticker,
            observed_days: observed,
            expected_days: expected,
            message,
        }
    }
}
