//! Performance statistics calculation
//!
//! Derives risk/return metrics from a portfolio snapshot series, with an
//! optional benchmark series for relative measures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::debug;

use crate::market::{snapshot_returns, PortfolioSnapshot};

/// Derived risk/return metrics for one backtest run.
///
/// Rates and ratios are fractions, not percentages: a 5% total return is
/// 0.05. With fewer than two snapshots every metric is zero; division by
/// zero anywhere resolves to the documented zero fallback instead of an
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    /// Geometric annualization over actual trading days, not calendar days
    pub annualized_return: f64,
    /// Sample standard deviation of daily returns, annualized
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Largest peak-to-trough decline as a fraction of the peak, in [0, 1]
    pub max_drawdown: f64,
    /// 5th percentile of daily returns
    pub var_95: f64,
    /// Mean of daily returns at or below the VaR percentile
    pub cvar_95: f64,
    /// Only present when a benchmark series was supplied
    pub beta: Option<f64>,
    pub alpha: Option<f64>,
    pub benchmark_return: Option<f64>,
    pub trading_days: usize,
    pub final_value: f64,
}

/// Calculate performance metrics from a snapshot series.
///
/// `annual_days` is the trading-day count used for annualization
/// (conventionally 252); `risk_free_rate` is annualized.
pub fn calculate_metrics(
    snapshots: &[PortfolioSnapshot],
    initial_capital: f64,
    benchmark: Option<&[PortfolioSnapshot]>,
    risk_free_rate: f64,
    annual_days: u32,
) -> PerformanceMetrics {
    let trading_days = snapshots.len();

    // Fewer than 2 points is a defined "no data" state, not an error
    if trading_days < 2 || initial_capital <= 0.0 {
        return PerformanceMetrics {
            trading_days,
            final_value: snapshots.last().map(|s| s.total_value).unwrap_or(0.0),
            ..Default::default()
        };
    }

    let final_value = snapshots[trading_days - 1].total_value;
    let total_return = final_value / initial_capital - 1.0;
    let annualized_return =
        (1.0 + total_return).powf(annual_days as f64 / trading_days as f64) - 1.0;

    let daily_returns = snapshot_returns(snapshots);

    let daily_std = (&daily_returns[..]).std_dev();
    let volatility = if daily_std.is_finite() {
        daily_std * (annual_days as f64).sqrt()
    } else {
        0.0
    };

    let sharpe_ratio = if volatility > 0.0 {
        (annualized_return - risk_free_rate) / volatility
    } else {
        0.0
    };

    let sortino_ratio = sortino(
        &daily_returns,
        annualized_return,
        risk_free_rate,
        annual_days,
    );

    let max_drawdown = calculate_max_drawdown(snapshots);
    let calmar_ratio = if max_drawdown > 0.0 {
        annualized_return / max_drawdown
    } else {
        0.0
    };

    let (var_95, cvar_95) = tail_risk(&daily_returns);

    let mut metrics = PerformanceMetrics {
        total_return,
        annualized_return,
        volatility,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        var_95,
        cvar_95,
        beta: None,
        alpha: None,
        benchmark_return: None,
        trading_days,
        final_value,
    };

    if let Some(bench) = benchmark {
        apply_benchmark(&mut metrics, snapshots, bench, risk_free_rate, annual_days);
    }

    debug!(
        "Metrics: return {:.4}, annualized {:.4}, vol {:.4}, sharpe {:.2}, max_dd {:.4}",
        total_return, annualized_return, volatility, sharpe_ratio, max_drawdown
    );

    metrics
}

/// Maximum drawdown of a snapshot series, tracked via a running peak that
/// only increases. Fraction of the peak, in [0, 1].
pub fn calculate_max_drawdown(snapshots: &[PortfolioSnapshot]) -> f64 {
    let mut peak = 0.0;
    let mut max_drawdown = 0.0;

    for snapshot in snapshots {
        if snapshot.total_value > peak {
            peak = snapshot.total_value;
        }
        if peak > 0.0 {
            let drawdown = (peak - snapshot.total_value) / peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    max_drawdown
}

/// Sortino ratio: excess annualized return over downside deviation.
///
/// Downside deviation is the sample standard deviation of negative daily
/// returns only, annualized. Zero when there are no negative returns.
fn sortino(
    daily_returns: &[f64],
    annualized_return: f64,
    risk_free_rate: f64,
    annual_days: u32,
) -> f64 {
    let negatives: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    if negatives.len() < 2 {
        return 0.0;
    }

    let downside_std = (&negatives[..]).std_dev();
    if !downside_std.is_finite() || downside_std == 0.0 {
        return 0.0;
    }

    let downside_deviation = downside_std * (annual_days as f64).sqrt();
    (annualized_return - risk_free_rate) / downside_deviation
}

/// VaR95 (5th percentile of daily returns) and CVaR95 (mean of the tail at
/// or below it).
fn tail_risk(daily_returns: &[f64]) -> (f64, f64) {
    if daily_returns.is_empty() {
        return (0.0, 0.0);
    }

    let mut data = Data::new(daily_returns.to_vec());
    let var_95 = data.percentile(5);

    let tail: Vec<f64> = daily_returns
        .iter()
        .copied()
        .filter(|r| *r <= var_95)
        .collect();
    let cvar_95 = if tail.is_empty() {
        var_95
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };

    (var_95, cvar_95)
}

/// Fill in beta, alpha and benchmark return from a benchmark series.
fn apply_benchmark(
    metrics: &mut PerformanceMetrics,
    snapshots: &[PortfolioSnapshot],
    benchmark: &[PortfolioSnapshot],
    risk_free_rate: f64,
    annual_days: u32,
) {
    if benchmark.len() < 2 {
        return;
    }

    let first = benchmark[0].total_value;
    let last = benchmark[benchmark.len() - 1].total_value;
    if first <= 0.0 {
        return;
    }
    let benchmark_total = last / first - 1.0;
    let benchmark_annualized =
        (1.0 + benchmark_total).powf(annual_days as f64 / benchmark.len() as f64) - 1.0;
    metrics.benchmark_return = Some(benchmark_total);

    let pairs = aligned_returns(snapshots, benchmark);
    if pairs.len() < 2 {
        return;
    }

    let portfolio: Vec<f64> = pairs.iter().map(|(p, _)| *p).collect();
    let bench: Vec<f64> = pairs.iter().map(|(_, b)| *b).collect();

    let bench_var = (&bench[..]).variance();
    if !bench_var.is_finite() || bench_var == 0.0 {
        return;
    }

    let beta = sample_covariance(&portfolio, &bench) / bench_var;
    let alpha = metrics.annualized_return
        - (risk_free_rate + beta * (benchmark_annualized - risk_free_rate));

    metrics.beta = Some(beta);
    metrics.alpha = Some(alpha);
}

/// Inner-join two snapshot series on date and return paired daily returns.
fn aligned_returns(
    a: &[PortfolioSnapshot],
    b: &[PortfolioSnapshot],
) -> Vec<(f64, f64)> {
    let ra = dated_returns(a);
    let rb = dated_returns(b);

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < ra.len() && j < rb.len() {
        match ra[i].0.cmp(&rb[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                pairs.push((ra[i].1, rb[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    pairs
}

fn dated_returns(snapshots: &[PortfolioSnapshot]) -> Vec<(NaiveDate, f64)> {
    snapshots
        .windows(2)
        .filter(|w| w[0].total_value > 0.0)
        .map(|w| (w[1].date, w[1].total_value / w[0].total_value - 1.0))
        .collect()
}

fn sample_covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    x[..n]
        .iter()
        .zip(&y[..n])
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum::<f64>()
        / (n - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshots_from(values: &[f64]) -> Vec<PortfolioSnapshot> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                PortfolioSnapshot::new(
                    date(2020, 1, 1) + chrono::Duration::days(i as i64),
                    *v,
                )
            })
            .collect()
    }

    #[test]
    fn test_too_few_snapshots_all_zero() {
        let snapshots = snapshots_from(&[100_000.0]);
        let metrics = calculate_metrics(&snapshots, 100_000.0, None, 0.04, 252);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.trading_days, 1);
    }

    #[test]
    fn test_constant_series() {
        let snapshots = snapshots_from(&[100_000.0; 10]);
        let metrics = calculate_metrics(&snapshots, 100_000.0, None, 0.04, 252);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.calmar_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn test_total_and_annualized_return() {
        let mut values = Vec::new();
        for i in 0..=252 {
            values.push(100_000.0 * (1.0 + 0.10 * i as f64 / 252.0));
        }
        let snapshots = snapshots_from(&values);
        let metrics = calculate_metrics(&snapshots, 100_000.0, None, 0.0, 252);
        assert!((metrics.total_return - 0.10).abs() < 1e-9);
        // 253 trading days: slightly less than one full 252-day year
        assert!(metrics.annualized_return > 0.09 && metrics.annualized_return < 0.10);
    }

    #[test]
    fn test_max_drawdown_bounds() {
        let snapshots = snapshots_from(&[100.0, 120.0, 90.0, 110.0, 80.0]);
        let dd = calculate_max_drawdown(&snapshots);
        assert!((dd - (120.0 - 80.0) / 120.0).abs() < 1e-12);
        assert!(dd >= 0.0 && dd <= 1.0);
    }

    #[test]
    fn test_var_cvar_ordering() {
        let values = vec![
            100.0, 101.0, 99.0, 100.5, 98.0, 99.5, 101.5, 100.0, 97.0, 99.0, 102.0,
        ];
        let snapshots = snapshots_from(&values);
        let metrics = calculate_metrics(&snapshots, 100.0, None, 0.0, 252);
        // CVaR averages the tail at or below VaR, so it cannot exceed VaR
        assert!(metrics.cvar_95 <= metrics.var_95 + 1e-12);
    }

    #[test]
    fn test_benchmark_beta_of_itself() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let snapshots = snapshots_from(&values);
        let metrics = calculate_metrics(&snapshots, 100.0, Some(&snapshots), 0.0, 252);
        // A portfolio measured against itself has beta 1
        let beta = metrics.beta.unwrap();
        assert!((beta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_benchmark_leaves_relative_metrics_empty() {
        let snapshots = snapshots_from(&[100.0, 101.0, 102.0]);
        let metrics = calculate_metrics(&snapshots, 100.0, None, 0.0, 252);
        assert!(metrics.beta.is_none());
        assert!(metrics.alpha.is_none());
        assert!(metrics.benchmark_return.is_none());
    }
}
