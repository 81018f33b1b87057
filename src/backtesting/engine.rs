//! Backtest simulator
//!
//! Discrete-event simulation over the daily trading calendar. Maintains cash
//! plus whole-share holdings, applies the configured strategy and emits a
//! snapshot series with a trade ledger.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use super::base::{BacktestConfig, BacktestResult};
use super::statistics::calculate_metrics;
use crate::error::{EngineError, Result};
use crate::market::{
    DataWarning, Holding, PortfolioSnapshot, PriceSeries, StrategyKind, Trade, TradeAction,
    COVERAGE_THRESHOLD,
};
use crate::setting::SETTINGS;

/// Backtest simulator for one allocation over a date range.
///
/// All state mutated during a run is local to that run; the engine itself
/// only holds the configuration and the preloaded price series, so separate
/// runs never interfere.
pub struct BacktestEngine {
    config: BacktestConfig,
    price_data: HashMap<String, PriceSeries>,
    benchmark_data: Option<PriceSeries>,
}

/// Mutable per-run simulation state.
struct RunState {
    cash: f64,
    holdings: HashMap<String, u64>,
    trades: Vec<Trade>,
}

impl RunState {
    fn new(cash: f64) -> Self {
        Self {
            cash,
            holdings: HashMap::new(),
            trades: Vec::new(),
        }
    }

    fn buy(&mut self, date: NaiveDate, ticker: &str, shares: u64, price: f64) {
        self.cash -= shares as f64 * price;
        *self.holdings.entry(ticker.to_string()).or_insert(0) += shares;
        self.trades.push(Trade {
            date,
            ticker: ticker.to_string(),
            action: TradeAction::Buy,
            shares,
            price,
        });
    }

    fn sell_all(&mut self, date: NaiveDate, ticker: &str, price: f64) {
        let shares = self.holdings.get(ticker).copied().unwrap_or(0);
        if shares == 0 {
            return;
        }
        self.cash += shares as f64 * price;
        self.holdings.insert(ticker.to_string(), 0);
        self.trades.push(Trade {
            date,
            ticker: ticker.to_string(),
            action: TradeAction::Sell,
            shares,
            price,
        });
    }
}

impl BacktestEngine {
    /// Create a new engine, validating the configuration up front.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            price_data: HashMap::new(),
            benchmark_data: None,
        })
    }

    /// Load the price series for one allocated ticker.
    pub fn add_price_series(&mut self, series: PriceSeries) {
        debug!("Loaded {} bars for {}", series.len(), series.ticker);
        self.price_data.insert(series.ticker.clone(), series);
    }

    /// Load the optional benchmark series.
    pub fn set_benchmark_series(&mut self, series: PriceSeries) {
        self.benchmark_data = Some(series);
    }

    /// Run the simulation and produce the complete result bundle.
    pub fn run(&self) -> Result<BacktestResult> {
        let config = &self.config;
        info!(
            "Starting backtest: {} tickers, {} to {}, strategy {}",
            config.allocations.len(),
            config.start,
            config.end,
            config.strategy
        );

        let calendar = self.trading_calendar();
        if calendar.is_empty() {
            return Err(EngineError::insufficient_data("trading calendar", 1, 0));
        }

        let warnings = self.coverage_warnings(&calendar);

        let first_day = calendar[0];
        let mut state = RunState::new(config.initial_capital);
        self.invest_initial_capital(&mut state, first_day)?;

        let mut last_period = config.rebalance_frequency.period_key(first_day);
        let mut snapshots = Vec::with_capacity(calendar.len());

        for &day in &calendar {
            if day != first_day && config.strategy == StrategyKind::EqualWeightRebalance {
                let period = config.rebalance_frequency.period_key(day);
                if period != last_period {
                    self.rebalance(&mut state, day);
                    last_period = period;
                }
            }

            snapshots.push(PortfolioSnapshot::new(day, self.valuation(&state, day)));
        }

        let risk_free_rate = config
            .risk_free_rate
            .or_else(|| SETTINGS.get_float("metrics.risk_free_rate"))
            .unwrap_or(0.04);
        let annual_days = SETTINGS.get_int("metrics.annual_days").unwrap_or(252) as u32;

        let benchmark_snapshots = self.benchmark_snapshots();
        let metrics = calculate_metrics(
            &snapshots,
            config.initial_capital,
            benchmark_snapshots.as_deref(),
            risk_free_rate,
            annual_days,
        );

        let mut final_holdings: Vec<Holding> = state
            .holdings
            .iter()
            .filter(|(_, shares)| **shares > 0)
            .map(|(ticker, shares)| Holding {
                ticker: ticker.clone(),
                shares: *shares,
            })
            .collect();
        final_holdings.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        info!(
            "Backtest complete: {} trading days, {} trades, final value {:.2}",
            snapshots.len(),
            state.trades.len(),
            snapshots.last().map(|s| s.total_value).unwrap_or(0.0)
        );

        Ok(BacktestResult {
            metrics,
            snapshots,
            final_holdings,
            final_cash: state.cash,
            trades: state.trades,
            warnings,
        })
    }

    /// Trading calendar: sorted union of all dates present in any allocated
    /// ticker's series within the configured range.
    fn trading_calendar(&self) -> Vec<NaiveDate> {
        let mut days = BTreeSet::new();
        for ticker in self.config.tickers() {
            if let Some(series) = self.price_data.get(&ticker) {
                for date in series.dates_in(self.config.start, self.config.end) {
                    days.insert(date);
                }
            }
        }
        days.into_iter().collect()
    }

    /// Partial-coverage warnings for tickers materially short of the
    /// calendar's expected trading-day count.
    fn coverage_warnings(&self, calendar: &[NaiveDate]) -> Vec<DataWarning> {
        let expected = calendar.len();
        let mut warnings = Vec::new();

        for ticker in self.config.tickers() {
            let observed = self
                .price_data
                .get(&ticker)
                .map(|s| s.dates_in(self.config.start, self.config.end).len())
                .unwrap_or(0);

            if (observed as f64) < COVERAGE_THRESHOLD * expected as f64 {
                warn!(
                    "Partial coverage for {}: {} of {} trading days",
                    ticker, observed, expected
                );
                warnings.push(DataWarning::partial_coverage(ticker, observed, expected));
            }
        }

        warnings
    }

    /// Invest the initial capital on the first trading day.
    ///
    /// Buy-and-hold splits capital per target weight; the rebalancing
    /// strategy splits evenly. Weights of tickers without a valid price on
    /// day one are redistributed across those that have one.
    fn invest_initial_capital(&self, state: &mut RunState, day: NaiveDate) -> Result<()> {
        let mut investable: Vec<(&str, f64, f64)> = Vec::new();
        for alloc in &self.config.allocations {
            if let Some(price) = self.price_on(&alloc.ticker, day) {
                let weight = match self.config.strategy {
                    StrategyKind::BuyHold => alloc.weight,
                    StrategyKind::EqualWeightRebalance => 1.0,
                };
                investable.push((alloc.ticker.as_str(), weight, price));
            } else {
                warn!("No valid price for {} on {}", alloc.ticker, day);
            }
        }

        if investable.is_empty() {
            return Err(EngineError::no_starting_price(day));
        }

        let total_weight: f64 = investable.iter().map(|(_, w, _)| w).sum();
        let capital = state.cash;

        for (ticker, weight, price) in investable {
            let allocated = capital * weight / total_weight;
            // Whole shares only, rounded down so cash can never go negative
            let shares = (allocated / price).floor() as u64;
            if shares > 0 {
                state.buy(day, ticker, shares, price);
            }
        }

        Ok(())
    }

    /// Liquidate and re-buy equal dollar amounts across tickers priced today.
    ///
    /// A held ticker with no price today cannot be liquidated; it is kept
    /// and sold at a later rebalance when a price exists.
    fn rebalance(&self, state: &mut RunState, day: NaiveDate) {
        debug!("Rebalancing on {}", day);

        let held: Vec<String> = state
            .holdings
            .iter()
            .filter(|(_, shares)| **shares > 0)
            .map(|(ticker, _)| ticker.clone())
            .collect();
        for ticker in held {
            if let Some(price) = self.price_on(&ticker, day) {
                state.sell_all(day, &ticker, price);
            }
        }

        let investable: Vec<(&str, f64)> = self
            .config
            .allocations
            .iter()
            .filter_map(|a| self.price_on(&a.ticker, day).map(|p| (a.ticker.as_str(), p)))
            .collect();

        if investable.is_empty() {
            return;
        }

        let per_ticker = state.cash / investable.len() as f64;
        for (ticker, price) in investable {
            let shares = (per_ticker / price).floor() as u64;
            if shares > 0 {
                state.buy(day, ticker, shares, price);
            }
        }
    }

    /// Portfolio value on a day: cash plus priced holdings.
    ///
    /// A held ticker with no price on this day is excluded from today's
    /// valuation only; the holding itself is untouched.
    fn valuation(&self, state: &RunState, day: NaiveDate) -> f64 {
        let mut value = state.cash;
        for (ticker, shares) in &state.holdings {
            if *shares == 0 {
                continue;
            }
            if let Some(price) = self.price_on(ticker, day) {
                value += *shares as f64 * price;
            }
        }
        value
    }

    fn price_on(&self, ticker: &str, day: NaiveDate) -> Option<f64> {
        self.price_data.get(ticker)?.price_on(day)
    }

    /// Benchmark price series as a snapshot series over the backtest range.
    fn benchmark_snapshots(&self) -> Option<Vec<PortfolioSnapshot>> {
        let series = self.benchmark_data.as_ref()?;
        let snapshots: Vec<PortfolioSnapshot> = series
            .slice(self.config.start, self.config.end)
            .bars()
            .iter()
            .map(|bar| PortfolioSnapshot::new(bar.date, bar.price()))
            .collect();
        Some(snapshots)
    }
}
