//! Monte Carlo forward projection via bootstrap resampling.
//!
//! Resamples historical daily returns with replacement to generate simulated
//! forward paths. The same historical day is drawn across all assets (block
//! bootstrap), preserving the cross-asset correlation structure. Paths are
//! independent, so they are sharded across worker threads with one seeded
//! generator per path; results are identical regardless of scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::market::{align_block, PortfolioAllocation, ReturnSeries};
use crate::setting::SETTINGS;

/// Hard caps on caller-supplied simulation size.
const MAX_SIMULATIONS: usize = 100_000;
const MAX_HORIZON_YEARS: f64 = 50.0;

/// Configuration for a Monte Carlo projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Projection horizon in years; trading days = 252 x years
    pub horizon_years: f64,
    pub simulations: usize,
    /// Base seed; path i uses seed base_seed + i
    pub base_seed: u64,
    /// Ending-value percentiles reported as bands
    pub percentiles: Vec<u8>,
    /// Include the full sorted ending-value distribution in the result
    pub include_final_values: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            horizon_years: 1.0,
            simulations: SETTINGS
                .get_int("montecarlo.simulations")
                .unwrap_or(1000)
                .max(1) as usize,
            base_seed: SETTINGS.get_int("montecarlo.seed").unwrap_or(42) as u64,
            percentiles: vec![5, 25, 50, 75, 95],
            include_final_values: false,
        }
    }
}

impl MonteCarloConfig {
    fn validate(&self) -> Result<()> {
        if self.simulations == 0 || self.simulations > MAX_SIMULATIONS {
            return Err(EngineError::input_validation(format!(
                "simulation count must be in 1..={}",
                MAX_SIMULATIONS
            )));
        }
        if self.horizon_years <= 0.0 || self.horizon_years > MAX_HORIZON_YEARS {
            return Err(EngineError::input_validation(format!(
                "projection horizon must be in (0, {}] years",
                MAX_HORIZON_YEARS
            )));
        }
        if self.percentiles.is_empty() || self.percentiles.iter().any(|p| *p > 100) {
            return Err(EngineError::input_validation(
                "percentiles must be non-empty values in 0..=100",
            ));
        }
        Ok(())
    }

    fn horizon_days(&self, annual_days: u32) -> usize {
        (annual_days as f64 * self.horizon_years).round().max(1.0) as usize
    }
}

/// Ending value at one percentile of the simulated distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileBand {
    pub percentile: u8,
    pub ending_value: f64,
}

/// Result of a Monte Carlo projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub percentile_bands: Vec<PercentileBand>,
    pub mean_ending_value: f64,
    pub median_ending_value: f64,
    /// Share of paths ending below the initial value
    pub probability_of_loss: f64,
    pub horizon_days: usize,
    pub simulations: usize,
    /// Sorted ending values, present when requested in the config
    pub final_values: Option<Vec<f64>>,
}

/// Monte Carlo projector over historical per-asset daily returns.
pub struct MonteCarloProjector {
    config: MonteCarloConfig,
}

impl MonteCarloProjector {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// Project forward paths for an allocation.
    ///
    /// `returns` holds one historical daily return series per allocated
    /// ticker; series are aligned on their common dates before sampling.
    pub fn project(
        &self,
        returns: &[ReturnSeries],
        allocations: &[PortfolioAllocation],
        initial_value: f64,
    ) -> Result<MonteCarloResult> {
        self.config.validate()?;

        if initial_value <= 0.0 || !initial_value.is_finite() {
            return Err(EngineError::input_validation(
                "initial value must be positive",
            ));
        }
        if returns.is_empty() {
            return Err(EngineError::input_validation(
                "at least one return series is required",
            ));
        }

        let weights = self.normalized_weights(returns, allocations)?;

        let rows = align_block(returns);
        if rows.is_empty() {
            return Err(EngineError::insufficient_data(
                "monte carlo resampling",
                1,
                0,
            ));
        }

        let annual_days = SETTINGS.get_int("metrics.annual_days").unwrap_or(252) as u32;
        let horizon_days = self.config.horizon_days(annual_days);
        let base_seed = self.config.base_seed;

        info!(
            "Monte Carlo projection: {} paths x {} days over {} aligned return rows",
            self.config.simulations,
            horizon_days,
            rows.len()
        );

        let mut final_values: Vec<f64> = (0..self.config.simulations)
            .into_par_iter()
            .map(|path| {
                let mut rng = StdRng::seed_from_u64(base_seed + path as u64);
                let mut value = initial_value;
                for _ in 0..horizon_days {
                    let row = &rows[rng.random_range(0..rows.len())];
                    let mut portfolio_return = 0.0;
                    for (weight, asset_return) in weights.iter().zip(row) {
                        portfolio_return += weight * asset_return;
                    }
                    value *= 1.0 + portfolio_return;
                }
                value
            })
            .collect();

        final_values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = final_values.len();
        let percentile_bands = self
            .config
            .percentiles
            .iter()
            .map(|&p| PercentileBand {
                percentile: p,
                ending_value: final_values[percentile_index(p, n)],
            })
            .collect();

        let mean_ending_value = final_values.iter().sum::<f64>() / n as f64;
        let median_ending_value = final_values[percentile_index(50, n)];
        let losses = final_values.iter().filter(|v| **v < initial_value).count();

        Ok(MonteCarloResult {
            percentile_bands,
            mean_ending_value,
            median_ending_value,
            probability_of_loss: losses as f64 / n as f64,
            horizon_days,
            simulations: n,
            final_values: if self.config.include_final_values {
                Some(final_values)
            } else {
                None
            },
        })
    }

    /// Weights matched to the return series order, normalized to sum 1.
    fn normalized_weights(
        &self,
        returns: &[ReturnSeries],
        allocations: &[PortfolioAllocation],
    ) -> Result<Vec<f64>> {
        let mut weights = Vec::with_capacity(returns.len());
        for series in returns {
            let weight = allocations
                .iter()
                .find(|a| a.ticker == series.ticker)
                .map(|a| a.weight)
                .ok_or_else(|| {
                    EngineError::input_validation(format!(
                        "no allocation weight for {}",
                        series.ticker
                    ))
                })?;
            weights.push(weight);
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::input_validation("allocation weights sum to 0"));
        }
        Ok(weights.into_iter().map(|w| w / total).collect())
    }
}

fn percentile_index(percentile: u8, n: usize) -> usize {
    let idx = (percentile as f64 / 100.0 * (n as f64 - 1.0)).round() as usize;
    idx.min(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{PriceBar, PriceSeries};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn returns_from(ticker: &str, closes: &[f64]) -> ReturnSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                PriceBar::new(
                    ticker,
                    date(2020, 1, 1) + chrono::Duration::days(i as i64),
                    *c,
                )
            })
            .collect();
        ReturnSeries::simple(&PriceSeries::new(ticker, bars))
    }

    fn config(simulations: usize, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            horizon_years: 0.1,
            simulations,
            base_seed: seed,
            percentiles: vec![5, 25, 50, 75, 95],
            include_final_values: false,
        }
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let returns = vec![
            returns_from("SPY", &[100.0, 101.0, 100.5, 102.0, 101.2, 103.0]),
            returns_from("TLT", &[50.0, 49.8, 50.1, 49.9, 50.3, 50.0]),
        ];
        let allocations = vec![
            PortfolioAllocation::new("SPY", 60.0),
            PortfolioAllocation::new("TLT", 40.0),
        ];
        let projector = MonteCarloProjector::new(config(200, 7));

        let r1 = projector.project(&returns, &allocations, 100_000.0).unwrap();
        let r2 = projector.project(&returns, &allocations, 100_000.0).unwrap();

        for (a, b) in r1.percentile_bands.iter().zip(&r2.percentile_bands) {
            assert_eq!(a.ending_value, b.ending_value);
        }
        assert_eq!(r1.mean_ending_value, r2.mean_ending_value);
    }

    #[test]
    fn test_constant_positive_returns_compound() {
        // Every historical day is +1%, so every path is deterministic
        let returns = vec![returns_from("SPY", &[100.0, 101.0, 102.01, 103.0301])];
        let allocations = vec![PortfolioAllocation::new("SPY", 100.0)];
        let projector = MonteCarloProjector::new(MonteCarloConfig {
            horizon_years: 10.0 / 252.0,
            simulations: 10,
            base_seed: 1,
            percentiles: vec![50],
            include_final_values: true,
        });

        let result = projector.project(&returns, &allocations, 1_000.0).unwrap();
        let expected = 1_000.0 * 1.01f64.powi(10);
        for value in result.final_values.as_deref().unwrap() {
            assert!((value - expected).abs() < 1e-6);
        }
        assert_eq!(result.probability_of_loss, 0.0);
    }

    #[test]
    fn test_percentile_bands_ordered() {
        let returns = vec![returns_from(
            "SPY",
            &[100.0, 102.0, 99.0, 101.0, 98.5, 103.0, 100.2, 104.0],
        )];
        let allocations = vec![PortfolioAllocation::new("SPY", 100.0)];
        let projector = MonteCarloProjector::new(config(500, 42));

        let result = projector.project(&returns, &allocations, 100_000.0).unwrap();
        let bands = &result.percentile_bands;
        for pair in bands.windows(2) {
            assert!(pair[0].ending_value <= pair[1].ending_value);
        }
        assert_eq!(result.simulations, 500);
    }

    #[test]
    fn test_rejects_unknown_ticker() {
        let returns = vec![returns_from("SPY", &[100.0, 101.0])];
        let allocations = vec![PortfolioAllocation::new("QQQ", 100.0)];
        let projector = MonteCarloProjector::new(config(10, 1));
        assert!(projector.project(&returns, &allocations, 1_000.0).is_err());
    }

    #[test]
    fn test_rejects_oversized_request() {
        let returns = vec![returns_from("SPY", &[100.0, 101.0])];
        let allocations = vec![PortfolioAllocation::new("SPY", 100.0)];
        let mut cfg = config(10, 1);
        cfg.simulations = MAX_SIMULATIONS + 1;
        let projector = MonteCarloProjector::new(cfg);
        assert!(projector.project(&returns, &allocations, 1_000.0).is_err());
    }
}
