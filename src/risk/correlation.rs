//! Pairwise correlation of daily log returns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::market::{align_pair, ReturnSeries};
use crate::setting::SETTINGS;

/// Square, symmetric correlation matrix keyed by ticker.
///
/// Diagonal entries are exactly 1.0; off-diagonal entries lie in [-1, 1].
/// Pairs with too few aligned observations are reported as 0.0 and listed
/// in `low_confidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub low_confidence: Vec<(String, String)>,
}

impl CorrelationMatrix {
    /// Correlation between two tickers, if both are present.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        Some(self.values[i][j])
    }
}

/// Pearson correlation engine over daily log returns.
pub struct CorrelationEngine {
    /// Minimum aligned observations before a pair is trusted
    min_points: usize,
}

impl CorrelationEngine {
    pub fn new(min_points: usize) -> Self {
        Self { min_points }
    }

    /// Correlation matrix across 2+ return series.
    ///
    /// Each pair is aligned independently by exact date intersection; a day
    /// missing from either series drops out of that pair's sample only.
    pub fn compute(&self, series: &[ReturnSeries]) -> Result<CorrelationMatrix> {
        if series.len() < 2 {
            return Err(EngineError::input_validation(
                "correlation requires at least 2 tickers",
            ));
        }

        let n = series.len();
        let mut values = vec![vec![0.0; n]; n];
        let mut low_confidence = Vec::new();

        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let pairs = align_pair(&series[i], &series[j]);

                let correlation = if pairs.len() < self.min_points {
                    debug!(
                        "Low-confidence pair {}/{}: {} aligned points",
                        series[i].ticker,
                        series[j].ticker,
                        pairs.len()
                    );
                    low_confidence
                        .push((series[i].ticker.clone(), series[j].ticker.clone()));
                    0.0
                } else {
                    pearson(&pairs)
                };

                values[i][j] = correlation;
                values[j][i] = correlation;
            }
        }

        Ok(CorrelationMatrix {
            tickers: series.iter().map(|s| s.ticker.clone()).collect(),
            values,
            low_confidence,
        })
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        let min_points = SETTINGS.get_int("correlation.min_points").unwrap_or(20).max(2) as usize;
        Self::new(min_points)
    }
}

/// Pearson correlation of paired samples: cov(x,y) / sqrt(var(x) var(y)).
///
/// Degenerate variance on either side yields 0.0.
fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }

    (cov / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{PriceBar, PriceSeries};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log_returns(ticker: &str, closes: &[f64]) -> ReturnSeries {
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
        ReturnSeries::log(&PriceSeries::new(ticker, bars))
    }

    fn wavy(ticker: &str, n: usize, phase: f64) -> ReturnSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.5 + phase).sin() * 10.0)
            .collect();
        log_returns(ticker, &closes)
    }

    #[test]
    fn test_self_correlation_is_exactly_one() {
        let a = wavy("SPY", 40, 0.0);
        let b = wavy("SPY2", 40, 0.0);
        let matrix = CorrelationEngine::new(20).compute(&[a, b]).unwrap();
        assert_eq!(matrix.get("SPY", "SPY").unwrap(), 1.0);
        // Identical series correlate at 1 within float tolerance
        assert!((matrix.get("SPY", "SPY2").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry_and_range() {
        let series = vec![wavy("A", 50, 0.0), wavy("B", 50, 1.3), wavy("C", 50, 2.6)];
        let matrix = CorrelationEngine::new(20).compute(&series).unwrap();

        for i in 0..3 {
            assert_eq!(matrix.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(matrix.values[i][j], matrix.values[j][i]);
                assert!(matrix.values[i][j] >= -1.0 && matrix.values[i][j] <= 1.0);
            }
        }
    }

    #[test]
    fn test_below_min_points_reports_zero_and_flags() {
        let a = wavy("A", 10, 0.0);
        let b = wavy("B", 10, 1.0);
        let matrix = CorrelationEngine::new(20).compute(&[a, b]).unwrap();
        assert_eq!(matrix.get("A", "B").unwrap(), 0.0);
        assert_eq!(matrix.low_confidence.len(), 1);
    }

    #[test]
    fn test_requires_two_series() {
        let a = wavy("A", 30, 0.0);
        assert!(CorrelationEngine::new(20).compute(&[a]).is_err());
    }

    #[test]
    fn test_perfect_inverse_correlation() {
        // B moves exactly opposite to A in log space
        let a_closes: Vec<f64> = (0..30)
            .map(|i| 100.0 * (1.01f64).powi((i % 2) as i32))
            .collect();
        let b_closes: Vec<f64> = (0..30)
            .map(|i| 100.0 / (1.01f64).powi((i % 2) as i32))
            .collect();
        let a = log_returns("A", &a_closes);
        let b = log_returns("B", &b_closes);
        let matrix = CorrelationEngine::new(20).compute(&[a, b]).unwrap();
        assert!((matrix.get("A", "B").unwrap() + 1.0).abs() < 1e-9);
    }
}
