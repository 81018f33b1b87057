//! Macro regime classification from a curated historical table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};
use crate::market::VolatilityLevel;

/// Macro-economic regime used to tilt allocation weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Deficit-driven policy with inflation pressure
    FiscalActivism,
    /// Central-bank-anchored disinflation
    MonetaryDominance,
    /// Zero-rate, balance-sheet-expansion era
    QuantitativeEasing,
    /// Joint fiscal and monetary stimulus
    FiscalMonetaryCoordination,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::FiscalActivism => write!(f, "fiscal_activism"),
            Regime::MonetaryDominance => write!(f, "monetary_dominance"),
            Regime::QuantitativeEasing => write!(f, "quantitative_easing"),
            Regime::FiscalMonetaryCoordination => write!(f, "fiscal_monetary_coordination"),
        }
    }
}

/// One row of the historical regime reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub regime: Regime,
    /// Average annual inflation over the period, percent
    pub inflation_rate: f64,
    pub volatility_level: VolatilityLevel,
}

/// Built-in regime reference table.
pub fn default_periods() -> Vec<RegimePeriod> {
    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        // Literal table rows, all dates valid
        NaiveDate::from_ymd_opt(y, m, day).expect("valid reference date")
    }

    vec![
        RegimePeriod {
            start: d(1968, 1, 1),
            end: d(1981, 12, 31),
            regime: Regime::FiscalActivism,
            inflation_rate: 7.1,
            volatility_level: VolatilityLevel::High,
        },
        RegimePeriod {
            start: d(1982, 1, 1),
            end: d(2008, 8, 31),
            regime: Regime::MonetaryDominance,
            inflation_rate: 3.2,
            volatility_level: VolatilityLevel::Moderate,
        },
        RegimePeriod {
            start: d(2008, 9, 1),
            end: d(2019, 12, 31),
            regime: Regime::QuantitativeEasing,
            inflation_rate: 1.6,
            volatility_level: VolatilityLevel::Low,
        },
        RegimePeriod {
            start: d(2020, 1, 1),
            end: d(2024, 12, 31),
            regime: Regime::FiscalMonetaryCoordination,
            inflation_rate: 4.7,
            volatility_level: VolatilityLevel::High,
        },
    ]
}

/// Maps a calendar date to a macro regime.
///
/// Dates beyond the last table row resolve to the configured projection;
/// dates before the first row resolve to the baseline regime.
pub struct RegimeClassifier {
    periods: Vec<RegimePeriod>,
    baseline: Regime,
    projection: Regime,
}

impl RegimeClassifier {
    pub fn new(mut periods: Vec<RegimePeriod>, baseline: Regime, projection: Regime) -> Self {
        periods.sort_by_key(|p| p.start);
        Self {
            periods,
            baseline,
            projection,
        }
    }

    /// Load a period table from JSON, keeping the given fallbacks.
    pub fn from_json(json: &str, baseline: Regime, projection: Regime) -> Result<Self> {
        let periods: Vec<RegimePeriod> = serde_json::from_str(json)
            .map_err(|e| EngineError::input_validation(format!("bad regime table: {}", e)))?;
        Ok(Self::new(periods, baseline, projection))
    }

    /// Regime for a calendar date.
    pub fn classify(&self, date: NaiveDate) -> Regime {
        if let Some(period) = self.period_for(date) {
            return period.regime;
        }
        match self.periods.first() {
            Some(first) if date < first.start => self.baseline,
            _ => self.projection,
        }
    }

    /// Matching table row for a date, if any.
    pub fn period_for(&self, date: NaiveDate) -> Option<&RegimePeriod> {
        self.periods
            .iter()
            .find(|p| date >= p.start && date <= p.end)
    }

    /// Reference table currently in use.
    pub fn periods(&self) -> &[RegimePeriod] {
        &self.periods
    }
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new(
            default_periods(),
            Regime::MonetaryDominance,
            Regime::FiscalMonetaryCoordination,
        )
    }
}
