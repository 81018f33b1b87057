//! Analysis engine facade.
//!
//! Wires the price provider and reference tables into the individual
//! analytics components. Every method is an independent, synchronous step:
//! a multi-step analysis calls them one at a time, and a failed step never
//! invalidates results already returned by earlier ones.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::warn;

use crate::allocation::{
    AssetVolatility, OptimizationResult, Regime, RegimeClassifier, RiskParityOptimizer,
};
use crate::backtesting::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::error::{EngineError, Result};
use crate::market::{PortfolioAllocation, PriceProvider, PriceSeries, ReturnSeries};
use crate::risk::{
    CorrelationEngine, CorrelationMatrix, MonteCarloConfig, MonteCarloProjector,
    MonteCarloResult, StressResult, StressTester,
};
use crate::setting::SETTINGS;

/// Facade over the analytics components.
///
/// Holds no mutable state: concurrent analyses only share the read-only
/// price provider and the immutable reference tables.
pub struct AnalysisEngine {
    provider: Arc<dyn PriceProvider>,
    classifier: RegimeClassifier,
    stress_tester: StressTester,
    optimizer: RiskParityOptimizer,
    correlation: CorrelationEngine,
}

impl AnalysisEngine {
    /// Create an engine over a provider with the built-in reference tables.
    pub fn new(provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            provider,
            classifier: RegimeClassifier::default(),
            stress_tester: StressTester::default(),
            optimizer: RiskParityOptimizer::default(),
            correlation: CorrelationEngine::default(),
        }
    }

    /// Replace the regime reference table.
    pub fn with_classifier(mut self, classifier: RegimeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the stress scenario table.
    pub fn with_stress_tester(mut self, stress_tester: StressTester) -> Self {
        self.stress_tester = stress_tester;
        self
    }

    /// Replace the optimizer tables.
    pub fn with_optimizer(mut self, optimizer: RiskParityOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Run a backtest for the configured allocation and date range.
    pub fn run_backtest(&self, config: BacktestConfig) -> Result<BacktestResult> {
        let mut engine = BacktestEngine::new(config.clone())?;

        for ticker in config.tickers() {
            if let Some(series) = self.fetch(&ticker, config.start, config.end) {
                engine.add_price_series(series);
            }
        }

        if let Some(benchmark) = &config.benchmark {
            if let Some(series) = self.fetch(benchmark, config.start, config.end) {
                engine.set_benchmark_series(series);
            }
        }

        engine.run()
    }

    /// Project forward outcomes for an allocation via bootstrap resampling
    /// of its historical returns over [start, end].
    pub fn project_monte_carlo(
        &self,
        allocations: &[PortfolioAllocation],
        start: NaiveDate,
        end: NaiveDate,
        initial_value: f64,
        config: MonteCarloConfig,
    ) -> Result<MonteCarloResult> {
        let returns = self.simple_returns(
            &allocations.iter().map(|a| a.ticker.clone()).collect::<Vec<_>>(),
            start,
            end,
        );

        MonteCarloProjector::new(config).project(&returns, allocations, initial_value)
    }

    /// Replay the historical shock table against the current allocation.
    pub fn stress_test(&self, allocations: &[PortfolioAllocation]) -> Result<Vec<StressResult>> {
        self.stress_tester.run(allocations)
    }

    /// Correlation matrix of daily log returns across a ticker set.
    pub fn correlation_matrix(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CorrelationMatrix> {
        if tickers.len() < 2 {
            return Err(EngineError::input_validation(
                "correlation requires at least 2 tickers",
            ));
        }

        let returns = self.log_returns(tickers, start, end);
        self.correlation.compute(&returns)
    }

    /// Regime-tilted inverse-volatility weights for a ticker set, using
    /// history over [start, end] and the regime assumed as of `as_of`.
    pub fn optimize_allocation(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<OptimizationResult> {
        if tickers.len() < 2 {
            return Err(EngineError::input_validation(
                "optimization requires at least 2 tickers",
            ));
        }

        let returns = self.log_returns(tickers, start, end);
        let annual_days = SETTINGS.get_int("metrics.annual_days").unwrap_or(252) as u32;

        let volatilities: Vec<AssetVolatility> = returns
            .iter()
            .map(|r| AssetVolatility::new(r.ticker.clone(), r.annualized_volatility(annual_days)))
            .collect();

        let correlation = self.correlation.compute(&returns)?;
        let regime = self.classify(as_of);

        self.optimizer.optimize(&volatilities, &correlation, regime)
    }

    /// Regime for a calendar date, from the configured reference table.
    pub fn classify(&self, date: NaiveDate) -> Regime {
        self.classifier.classify(date)
    }

    /// Fetch a series, tolerating per-ticker provider failures.
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        match self.provider.daily_series(ticker, start, end) {
            Ok(series) => Some(series),
            Err(err) => {
                warn!("Price fetch failed for {}: {}", ticker, err);
                None
            }
        }
    }

    fn simple_returns(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<ReturnSeries> {
        tickers
            .iter()
            .filter_map(|t| self.fetch(t, start, end))
            .map(|s| ReturnSeries::simple(&s))
            .collect()
    }

    fn log_returns(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<ReturnSeries> {
        tickers
            .iter()
            .filter_map(|t| self.fetch(t, start, end))
            .map(|s| ReturnSeries::log(&s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MemoryPriceProvider;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider() -> Arc<MemoryPriceProvider> {
        let mut provider = MemoryPriceProvider::new();
        let mut spy = Vec::new();
        let mut tlt = Vec::new();
        let mut day = date(2020, 1, 2);
        let mut i = 0;
        while spy.len() < 60 {
            // Weekday-ish calendar: skip every 6th and 7th day
            if i % 7 < 5 {
                let t = spy.len() as f64;
                spy.push((day, 300.0 + (t * 0.3).sin() * 8.0 + t * 0.2));
                tlt.push((day, 140.0 + (t * 0.2).cos() * 3.0));
            }
            day = day + chrono::Duration::days(1);
            i += 1;
        }
        provider.load_closes("SPY", &spy);
        provider.load_closes("TLT", &tlt);
        Arc::new(provider)
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (date(2020, 1, 1), date(2020, 6, 30))
    }

    #[test]
    fn test_backtest_through_facade() {
        let engine = AnalysisEngine::new(provider());
        let (start, end) = range();
        let config = BacktestConfig::buy_hold(
            vec![
                PortfolioAllocation::new("SPY", 50.0),
                PortfolioAllocation::new("TLT", 50.0),
            ],
            start,
            end,
            100_000.0,
        );

        let result = engine.run_backtest(config).unwrap();
        assert_eq!(result.snapshots.len(), 60);
        assert_eq!(result.trades.len(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_monte_carlo_through_facade() {
        let engine = AnalysisEngine::new(provider());
        let (start, end) = range();
        let allocations = vec![
            PortfolioAllocation::new("SPY", 60.0),
            PortfolioAllocation::new("TLT", 40.0),
        ];
        let config = MonteCarloConfig {
            horizon_years: 0.5,
            simulations: 100,
            base_seed: 9,
            percentiles: vec![5, 50, 95],
            include_final_values: false,
        };

        let result = engine
            .project_monte_carlo(&allocations, start, end, 100_000.0, config)
            .unwrap();
        assert_eq!(result.percentile_bands.len(), 3);
        assert_eq!(result.simulations, 100);
    }

    #[test]
    fn test_correlation_through_facade() {
        let engine = AnalysisEngine::new(provider());
        let (start, end) = range();
        let matrix = engine
            .correlation_matrix(&["SPY".to_string(), "TLT".to_string()], start, end)
            .unwrap();
        assert_eq!(matrix.get("SPY", "SPY").unwrap(), 1.0);
        assert_eq!(matrix.get("SPY", "TLT"), matrix.get("TLT", "SPY"));
    }

    #[test]
    fn test_optimization_through_facade() {
        let engine = AnalysisEngine::new(provider());
        let (start, end) = range();
        let result = engine
            .optimize_allocation(
                &["SPY".to_string(), "TLT".to_string()],
                start,
                end,
                date(2021, 6, 1),
            )
            .unwrap();

        let total: f64 = result.weights.iter().map(|w| w.weight).sum();
        assert!((total - 100.0).abs() < 0.01);
        assert_eq!(result.regime, Regime::FiscalMonetaryCoordination);
        assert!(result.expected_volatility >= 0.0);
    }

    #[test]
    fn test_stress_test_through_facade() {
        let engine = AnalysisEngine::new(provider());
        let results = engine
            .stress_test(&[PortfolioAllocation::new("TLT", 100.0)])
            .unwrap();
        assert_eq!(results.len(), 5);
    }
}
