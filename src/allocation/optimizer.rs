//! Inverse-volatility allocation with regime tilts.
//!
//! Heuristic risk-parity weighting: weights proportional to inverse
//! volatility, then scaled by a per-regime multiplier on the defensive and
//! growth buckets and renormalized. Deliberately not a covariance-matrix
//! risk-parity solve; downstream expectations depend on this exact shape.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::regime::Regime;
use crate::error::{EngineError, Result};
use crate::market::PortfolioAllocation;
use crate::risk::CorrelationMatrix;
use crate::setting::SETTINGS;

/// Annualized volatility for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVolatility {
    pub ticker: String,
    pub annualized_vol: f64,
}

impl AssetVolatility {
    pub fn new(ticker: impl Into<String>, annualized_vol: f64) -> Self {
        Self {
            ticker: ticker.into(),
            annualized_vol,
        }
    }
}

/// Multipliers applied to the two tilted buckets under one regime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeTilt {
    pub defensive: f64,
    pub growth: f64,
}

/// Built-in per-regime multiplier table.
pub fn default_tilts() -> HashMap<Regime, RegimeTilt> {
    HashMap::from([
        (
            Regime::FiscalActivism,
            RegimeTilt {
                defensive: 1.30,
                growth: 0.75,
            },
        ),
        (
            Regime::MonetaryDominance,
            RegimeTilt {
                defensive: 0.90,
                growth: 1.20,
            },
        ),
        (
            Regime::QuantitativeEasing,
            RegimeTilt {
                defensive: 0.85,
                growth: 1.30,
            },
        ),
        (
            Regime::FiscalMonetaryCoordination,
            RegimeTilt {
                defensive: 1.20,
                growth: 0.85,
            },
        ),
    ])
}

/// Default defensive-bucket membership: bonds, gold and TIPS-like assets.
pub fn default_defensive_tickers() -> HashSet<String> {
    ["TLT", "IEF", "SHY", "BND", "AGG", "TIP", "VGIT", "VGLT", "GLD", "IAU", "SGOL"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

/// Default growth-bucket membership: high-beta tech-like assets.
pub fn default_growth_tickers() -> HashSet<String> {
    ["QQQ", "ARKK", "TSLA", "NVDA", "META", "AMZN", "AMD", "CRM", "SHOP", "BTC-USD", "ETH-USD"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

/// Result of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Weights in percent, summing to 100
    pub weights: Vec<PortfolioAllocation>,
    pub regime: Regime,
    /// sqrt(w' C w) over the supplied correlations and volatilities
    pub expected_volatility: f64,
    pub correlation: CorrelationMatrix,
    pub volatilities: Vec<AssetVolatility>,
}

/// Inverse-volatility optimizer with regime tilts.
pub struct RiskParityOptimizer {
    tilts: HashMap<Regime, RegimeTilt>,
    defensive: HashSet<String>,
    growth: HashSet<String>,
    /// Floor applied to volatilities before inversion
    volatility_floor: f64,
}

impl RiskParityOptimizer {
    pub fn new(
        tilts: HashMap<Regime, RegimeTilt>,
        defensive: HashSet<String>,
        growth: HashSet<String>,
        volatility_floor: f64,
    ) -> Self {
        Self {
            tilts,
            defensive,
            growth,
            volatility_floor,
        }
    }

    /// Derive tilted inverse-volatility weights for a regime.
    pub fn optimize(
        &self,
        volatilities: &[AssetVolatility],
        correlation: &CorrelationMatrix,
        regime: Regime,
    ) -> Result<OptimizationResult> {
        if volatilities.is_empty() {
            return Err(EngineError::input_validation("volatility list is empty"));
        }
        let mut seen = HashSet::new();
        for vol in volatilities {
            if !seen.insert(vol.ticker.as_str()) {
                return Err(EngineError::input_validation(format!(
                    "duplicate ticker in volatility list: {}",
                    vol.ticker
                )));
            }
        }

        // Inverse-volatility base weights, floored to avoid divide-by-zero
        let raw: Vec<f64> = volatilities
            .iter()
            .map(|v| 1.0 / v.annualized_vol.max(self.volatility_floor))
            .collect();
        let raw_total: f64 = raw.iter().sum();

        // Regime tilt on the two buckets, then renormalize
        let tilt = self
            .tilts
            .get(&regime)
            .copied()
            .unwrap_or(RegimeTilt {
                defensive: 1.0,
                growth: 1.0,
            });

        let tilted: Vec<f64> = volatilities
            .iter()
            .zip(&raw)
            .map(|(vol, w)| {
                let multiplier = if self.defensive.contains(&vol.ticker) {
                    tilt.defensive
                } else if self.growth.contains(&vol.ticker) {
                    tilt.growth
                } else {
                    1.0
                };
                w / raw_total * multiplier
            })
            .collect();
        let tilted_total: f64 = tilted.iter().sum();

        let fractions: Vec<f64> = tilted.iter().map(|w| w / tilted_total).collect();
        let weights: Vec<PortfolioAllocation> = volatilities
            .iter()
            .zip(&fractions)
            .map(|(vol, f)| PortfolioAllocation::new(vol.ticker.clone(), f * 100.0))
            .collect();

        let expected_volatility = portfolio_volatility(volatilities, &fractions, correlation);

        debug!(
            "Optimized {} tickers under {}: expected vol {:.4}",
            weights.len(),
            regime,
            expected_volatility
        );

        Ok(OptimizationResult {
            weights,
            regime,
            expected_volatility,
            correlation: correlation.clone(),
            volatilities: volatilities.to_vec(),
        })
    }
}

impl Default for RiskParityOptimizer {
    fn default() -> Self {
        let floor = SETTINGS
            .get_float("optimizer.volatility_floor")
            .unwrap_or(0.01);
        Self::new(
            default_tilts(),
            default_defensive_tickers(),
            default_growth_tickers(),
            floor,
        )
    }
}

/// Portfolio volatility sqrt(w' C w) from per-asset volatilities, weight
/// fractions and pairwise correlations. A pair absent from the matrix is
/// treated as uncorrelated.
fn portfolio_volatility(
    volatilities: &[AssetVolatility],
    fractions: &[f64],
    correlation: &CorrelationMatrix,
) -> f64 {
    let n = volatilities.len();
    let mut variance = 0.0;

    for i in 0..n {
        for j in 0..n {
            let rho = if i == j {
                1.0
            } else {
                correlation
                    .get(&volatilities[i].ticker, &volatilities[j].ticker)
                    .unwrap_or(0.0)
            };
            variance += fractions[i]
                * fractions[j]
                * rho
                * volatilities[i].annualized_vol
                * volatilities[j].annualized_vol;
        }
    }

    variance.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_matrix(tickers: &[&str]) -> CorrelationMatrix {
        let n = tickers.len();
        let mut values = vec![vec![0.0; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        CorrelationMatrix {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            values,
            low_confidence: Vec::new(),
        }
    }

    fn weight_sum(result: &OptimizationResult) -> f64 {
        result.weights.iter().map(|w| w.weight).sum()
    }

    #[test]
    fn test_weights_sum_to_100() {
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("SPY", 0.18),
            AssetVolatility::new("TLT", 0.12),
            AssetVolatility::new("GLD", 0.15),
            AssetVolatility::new("QQQ", 0.25),
        ];
        let matrix = identity_matrix(&["SPY", "TLT", "GLD", "QQQ"]);

        for regime in [
            Regime::FiscalActivism,
            Regime::MonetaryDominance,
            Regime::QuantitativeEasing,
            Regime::FiscalMonetaryCoordination,
        ] {
            let result = optimizer.optimize(&vols, &matrix, regime).unwrap();
            assert!((weight_sum(&result) - 100.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_near_zero_volatility_floored() {
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("SPY", 0.18),
            AssetVolatility::new("FLAT", 0.0),
        ];
        let matrix = identity_matrix(&["SPY", "FLAT"]);

        let result = optimizer
            .optimize(&vols, &matrix, Regime::MonetaryDominance)
            .unwrap();
        assert!((weight_sum(&result) - 100.0).abs() < 0.01);
        // The floored asset still receives a finite, dominant weight
        let flat = result.weights.iter().find(|w| w.ticker == "FLAT").unwrap();
        assert!(flat.weight > 90.0 && flat.weight.is_finite());
    }

    #[test]
    fn test_inverse_volatility_proportionality() {
        // Neither ticker is in a tilted bucket, so weights are purely 1/vol
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("AAA", 0.10),
            AssetVolatility::new("BBB", 0.20),
        ];
        let matrix = identity_matrix(&["AAA", "BBB"]);

        let result = optimizer
            .optimize(&vols, &matrix, Regime::QuantitativeEasing)
            .unwrap();
        let a = result.weights.iter().find(|w| w.ticker == "AAA").unwrap();
        let b = result.weights.iter().find(|w| w.ticker == "BBB").unwrap();
        assert!((a.weight / b.weight - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_regime_tilt_shifts_buckets() {
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("TLT", 0.15),
            AssetVolatility::new("QQQ", 0.15),
        ];
        let matrix = identity_matrix(&["TLT", "QQQ"]);

        // Equal vols: only the tilt separates the weights
        let inflationary = optimizer
            .optimize(&vols, &matrix, Regime::FiscalActivism)
            .unwrap();
        let tlt = inflationary.weights.iter().find(|w| w.ticker == "TLT").unwrap();
        let qqq = inflationary.weights.iter().find(|w| w.ticker == "QQQ").unwrap();
        assert!(tlt.weight > qqq.weight);

        let easing = optimizer
            .optimize(&vols, &matrix, Regime::QuantitativeEasing)
            .unwrap();
        let tlt = easing.weights.iter().find(|w| w.ticker == "TLT").unwrap();
        let qqq = easing.weights.iter().find(|w| w.ticker == "QQQ").unwrap();
        assert!(qqq.weight > tlt.weight);
    }

    #[test]
    fn test_expected_volatility_uncorrelated() {
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("AAA", 0.20),
            AssetVolatility::new("BBB", 0.20),
        ];
        let matrix = identity_matrix(&["AAA", "BBB"]);

        let result = optimizer
            .optimize(&vols, &matrix, Regime::MonetaryDominance)
            .unwrap();
        // Two equal-weight uncorrelated assets: sigma / sqrt(2)
        let expected = 0.20 / (2.0f64).sqrt();
        assert!((result.expected_volatility - expected).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_ticker_rejected() {
        let optimizer = RiskParityOptimizer::default();
        let vols = vec![
            AssetVolatility::new("SPY", 0.18),
            AssetVolatility::new("SPY", 0.20),
        ];
        let matrix = identity_matrix(&["SPY"]);
        assert!(optimizer
            .optimize(&vols, &matrix, Regime::MonetaryDominance)
            .is_err());
    }
}
