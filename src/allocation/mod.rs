//! Allocation module
//!
//! Macro regime classification and regime-tilted inverse-volatility
//! weighting.

pub mod optimizer;
pub mod regime;

pub use optimizer::{
    default_defensive_tickers, default_growth_tickers, default_tilts, AssetVolatility,
    OptimizationResult, RegimeTilt, RiskParityOptimizer,
};
pub use regime::{default_periods, Regime, RegimeClassifier, RegimePeriod};
