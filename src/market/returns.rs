//! Daily return derivation and date alignment.
//!
//! Every downstream component consumes returns produced here: simple returns
//! for simulation and metrics, log returns for correlation and volatility.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::object::{PortfolioSnapshot, PriceSeries};

/// One daily return observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered daily return series for one ticker.
///
/// Derived from a price series: length is one less than the price count and
/// dates are strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub ticker: String,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Simple day-over-day returns: p[t] / p[t-1] - 1.
    pub fn simple(series: &PriceSeries) -> Self {
        Self::derive(series, |prev, curr| curr / prev - 1.0)
    }

    /// Log returns: ln(p[t] / p[t-1]).
    pub fn log(series: &PriceSeries) -> Self {
        Self::derive(series, |prev, curr| (curr / prev).ln())
    }

    fn derive(series: &PriceSeries, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut points = Vec::new();
        let bars = series.bars();
        for window in bars.windows(2) {
            let prev = window[0].price();
            let curr = window[1].price();
            // Non-positive prices cannot produce a meaningful return
            if prev > 0.0 && curr > 0.0 {
                points.push(ReturnPoint {
                    date: window[1].date,
                    value: f(prev, curr),
                });
            }
        }
        Self {
            ticker: series.ticker.clone(),
            points,
        }
    }

    /// Return observations in date order.
    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    /// Return values without dates.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Annualized volatility: sample standard deviation scaled by
    /// sqrt(annual trading days). Zero for fewer than two observations.
    pub fn annualized_volatility(&self, annual_days: u32) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let values = self.values();
        let std = (&values[..]).std_dev();
        if std.is_finite() {
            std * (annual_days as f64).sqrt()
        } else {
            0.0
        }
    }
}

/// Inner-join two return series on exact date, producing paired values.
///
/// A day missing from either series is dropped from the paired sample.
pub fn align_pair(a: &ReturnSeries, b: &ReturnSeries) -> Vec<(f64, f64)> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    let (pa, pb) = (a.points(), b.points());

    while i < pa.len() && j < pb.len() {
        match pa[i].date.cmp(&pb[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                pairs.push((pa[i].value, pb[j].value));
                i += 1;
                j += 1;
            }
        }
    }

    pairs
}

/// Inner-join many return series on exact date.
///
/// Produces one row per date present in every series, each row holding the
/// per-asset return vector for that date in input order. This preserves the
/// cross-asset correlation structure for block bootstrapping.
pub fn align_block(series: &[ReturnSeries]) -> Vec<Vec<f64>> {
    if series.is_empty() {
        return Vec::new();
    }

    let mut indices = vec![0usize; series.len()];
    let mut rows = Vec::new();

    'outer: loop {
        // Largest current date across all cursors
        let mut max_date: Option<NaiveDate> = None;
        for (s, &idx) in series.iter().zip(&indices) {
            match s.points().get(idx) {
                Some(p) => {
                    if max_date.map_or(true, |d| p.date > d) {
                        max_date = Some(p.date);
                    }
                }
                None => break 'outer,
            }
        }
        let target = match max_date {
            Some(d) => d,
            None => break,
        };

        // Advance every cursor to the target date
        let mut aligned = true;
        for (s, idx) in series.iter().zip(indices.iter_mut()) {
            while *idx < s.len() && s.points()[*idx].date < target {
                *idx += 1;
            }
            match s.points().get(*idx) {
                Some(p) if p.date == target => {}
                Some(_) => aligned = false,
                None => break 'outer,
            }
        }

        if aligned {
            rows.push(
                series
                    .iter()
                    .zip(&indices)
                    .map(|(s, &idx)| s.points()[idx].value)
                    .collect(),
            );
            for idx in indices.iter_mut() {
                *idx += 1;
            }
        }
    }

    rows
}

/// Simple day-over-day returns of a snapshot series (n-1 values).
///
/// A non-positive previous value yields a 0.0 return for that day.
pub fn snapshot_returns(snapshots: &[PortfolioSnapshot]) -> Vec<f64> {
    let mut returns = Vec::new();
    for window in snapshots.windows(2) {
        if window[0].total_value > 0.0 {
            returns.push(window[1].total_value / window[0].total_value - 1.0);
        } else {
            returns.push(0.0);
        }
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::object::PriceBar;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(ticker: &str, prices: &[(NaiveDate, f64)]) -> PriceSeries {
        PriceSeries::new(
            ticker,
            prices
                .iter()
                .map(|(d, p)| PriceBar::new(ticker, *d, *p))
                .collect(),
        )
    }

    #[test]
    fn test_simple_returns_length() {
        let s = series(
            "SPY",
            &[
                (date(2020, 1, 2), 100.0),
                (date(2020, 1, 3), 110.0),
                (date(2020, 1, 6), 99.0),
            ],
        );
        let returns = ReturnSeries::simple(&s);
        assert_eq!(returns.len(), s.len() - 1);
        assert!((returns.values()[0] - 0.1).abs() < 1e-12);
        assert!((returns.values()[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_log_returns() {
        let s = series("SPY", &[(date(2020, 1, 2), 100.0), (date(2020, 1, 3), 110.0)]);
        let returns = ReturnSeries::log(&s);
        assert!((returns.values()[0] - (1.1f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_align_pair_inner_join() {
        let a = ReturnSeries::simple(&series(
            "A",
            &[
                (date(2020, 1, 2), 100.0),
                (date(2020, 1, 3), 101.0),
                (date(2020, 1, 6), 102.0),
                (date(2020, 1, 7), 103.0),
            ],
        ));
        // B is missing Jan 6, so the pair on Jan 6 and Jan 7 collapses
        let b = ReturnSeries::simple(&series(
            "B",
            &[
                (date(2020, 1, 2), 50.0),
                (date(2020, 1, 3), 51.0),
                (date(2020, 1, 7), 52.0),
            ],
        ));
        let pairs = align_pair(&a, &b);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_align_block_common_dates() {
        let a = ReturnSeries::simple(&series(
            "A",
            &[
                (date(2020, 1, 2), 100.0),
                (date(2020, 1, 3), 101.0),
                (date(2020, 1, 6), 102.0),
            ],
        ));
        let b = ReturnSeries::simple(&series(
            "B",
            &[
                (date(2020, 1, 2), 50.0),
                (date(2020, 1, 3), 51.0),
                (date(2020, 1, 6), 52.0),
            ],
        ));
        let rows = align_block(&[a, b]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_snapshot_returns() {
        let snapshots = vec![
            PortfolioSnapshot::new(date(2020, 1, 2), 100_000.0),
            PortfolioSnapshot::new(date(2020, 1, 3), 101_000.0),
            PortfolioSnapshot::new(date(2020, 1, 6), 99_990.0),
        ];
        let returns = snapshot_returns(&snapshots);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_annualized_volatility_constant_series() {
        let s = series(
            "X",
            &[
                (date(2020, 1, 2), 100.0),
                (date(2020, 1, 3), 100.0),
                (date(2020, 1, 6), 100.0),
            ],
        );
        let returns = ReturnSeries::simple(&s);
        assert_eq!(returns.annualized_volatility(252), 0.0);
    }
}
