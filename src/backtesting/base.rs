//! Backtesting base types
//!
//! Configuration and result types for the backtest simulator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::statistics::PerformanceMetrics;
use crate::error::{EngineError, Result};
use crate::market::{
    validate_allocations, DataWarning, Holding, PortfolioAllocation, PortfolioSnapshot,
    RebalanceFrequency, StrategyKind, Trade,
};

/// Configuration for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Target weights in percent, summing to 100 within tolerance
    pub allocations: Vec<PortfolioAllocation>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_capital: f64,
    pub strategy: StrategyKind,
    /// Only consulted by the rebalancing strategy
    pub rebalance_frequency: RebalanceFrequency,
    /// Annualized risk-free rate; engine settings supply the default
    pub risk_free_rate: Option<f64>,
    /// Optional benchmark ticker for beta/alpha
    pub benchmark: Option<String>,
}

impl BacktestConfig {
    /// Buy-and-hold configuration with defaults.
    pub fn buy_hold(
        allocations: Vec<PortfolioAllocation>,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
    ) -> Self {
        Self {
            allocations,
            start,
            end,
            initial_capital,
            strategy: StrategyKind::BuyHold,
            rebalance_frequency: RebalanceFrequency::Monthly,
            risk_free_rate: None,
            benchmark: None,
        }
    }

    /// Rebalancing configuration with defaults.
    pub fn rebalanced(
        allocations: Vec<PortfolioAllocation>,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
        frequency: RebalanceFrequency,
    ) -> Self {
        Self {
            allocations,
            start,
            end,
            initial_capital,
            strategy: StrategyKind::EqualWeightRebalance,
            rebalance_frequency: frequency,
            risk_free_rate: None,
            benchmark: None,
        }
    }

    /// Fail-fast validation before any simulation starts.
    pub fn validate(&self) -> Result<()> {
        validate_allocations(&self.allocations)?;

        if self.start >= self.end {
            return Err(EngineError::input_validation(format!(
                "date range is empty: {} to {}",
                self.start, self.end
            )));
        }

        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(EngineError::input_validation(
                "initial capital must be positive",
            ));
        }

        Ok(())
    }

    /// Tickers named by the allocation set.
    pub fn tickers(&self) -> Vec<String> {
        self.allocations.iter().map(|a| a.ticker.clone()).collect()
    }
}

/// Complete result of one backtest run.
///
/// Either the whole bundle is produced, or the run fails with a typed error;
/// partial results are never returned. Data-quality findings travel in
/// `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub metrics: PerformanceMetrics,
    /// One snapshot per trading day, strictly increasing dates
    pub snapshots: Vec<PortfolioSnapshot>,
    /// Holdings implied by the trade ledger at the end of the run
    pub final_holdings: Vec<Holding>,
    /// Un-invested cash at the end of the run
    pub final_cash: f64,
    /// Fully ordered trade ledger
    pub trades: Vec<Trade>,
    pub warnings: Vec<DataWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocations() -> Vec<PortfolioAllocation> {
        vec![
            PortfolioAllocation::new("SPY", 60.0),
            PortfolioAllocation::new("TLT", 40.0),
        ]
    }

    #[test]
    fn test_validate_ok() {
        let config = BacktestConfig::buy_hold(
            allocations(),
            date(2020, 1, 1),
            date(2020, 12, 31),
            100_000.0,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_range() {
        let config = BacktestConfig::buy_hold(
            allocations(),
            date(2020, 6, 1),
            date(2020, 6, 1),
            100_000.0,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_capital() {
        let config =
            BacktestConfig::buy_hold(allocations(), date(2020, 1, 1), date(2020, 12, 31), 0.0);
        assert!(config.validate().is_err());
    }
}
