//! Analytics Engine - backtesting and risk analytics for portfolio tracking
//!
//! This crate provides the numerical core of a portfolio-tracking platform:
//!
//! - Historical backtesting over daily price series (buy-and-hold and
//!   periodic rebalancing strategies)
//! - Risk/return performance metrics
//! - Monte Carlo forward projection via bootstrap resampling
//! - Stress testing against canonical historical shocks
//! - Cross-asset correlation
//! - Regime-tilted inverse-volatility allocation
//!
//! Price data is supplied by the host through the [`market::PriceProvider`]
//! seam; every analysis is a pure, synchronous computation over inputs
//! already in memory.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use analytics_engine::engine::AnalysisEngine;
//! use analytics_engine::market::{MemoryPriceProvider, PortfolioAllocation};
//! use analytics_engine::backtesting::BacktestConfig;
//! use chrono::NaiveDate;
//!
//! let provider = Arc::new(MemoryPriceProvider::new());
//! let engine = AnalysisEngine::new(provider);
//!
//! let config = BacktestConfig::buy_hold(
//!     vec![
//!         PortfolioAllocation::new("SPY", 60.0),
//!         PortfolioAllocation::new("TLT", 40.0),
//!     ],
//!     NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
//!     100_000.0,
//! );
//! let result = engine.run_backtest(config);
//! ```

pub mod allocation;
pub mod backtesting;
pub mod engine;
pub mod error;
pub mod logger;
pub mod market;
pub mod risk;
pub mod setting;

// Re-export commonly used types
pub use allocation::{
    AssetVolatility, OptimizationResult, Regime, RegimeClassifier, RegimePeriod,
    RiskParityOptimizer,
};
pub use backtesting::{
    BacktestConfig, BacktestEngine, BacktestResult, PerformanceMetrics,
};
pub use engine::AnalysisEngine;
pub use error::{EngineError, Result};
pub use market::{
    // Constants
    AssetBucket, RebalanceFrequency, StrategyKind, TradeAction,
    // Data objects
    DataWarning, Holding, PortfolioAllocation, PortfolioSnapshot, PriceBar, PriceSeries,
    ReturnSeries, Trade,
    // Provider
    MemoryPriceProvider, PriceProvider,
};
pub use risk::{
    CorrelationEngine, CorrelationMatrix, MonteCarloConfig, MonteCarloProjector,
    MonteCarloResult, StressResult, StressScenario, StressTester,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
