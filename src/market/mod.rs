//! Market data module
//!
//! Core data objects, constants, return derivation and the price provider
//! seam shared by every analytics component.

pub mod constant;
pub mod object;
pub mod provider;
pub mod returns;

pub use constant::{
    default_bucket, default_bucket_map, AssetBucket, RebalanceFrequency, StrategyKind,
    TradeAction, VolatilityLevel,
};
pub use object::{
    validate_allocations, DataWarning, Holding, PortfolioAllocation, PortfolioSnapshot, PriceBar,
    PriceSeries, Trade, COVERAGE_THRESHOLD, WEIGHT_SUM_TOLERANCE,
};
pub use provider::{MemoryPriceProvider, PriceProvider};
pub use returns::{align_block, align_pair, snapshot_returns, ReturnPoint, ReturnSeries};
