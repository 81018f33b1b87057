//! Risk analytics module
//!
//! Forward projection, stress testing and cross-asset correlation.

pub mod correlation;
pub mod monte_carlo;
pub mod stress;

pub use correlation::{CorrelationEngine, CorrelationMatrix};
pub use monte_carlo::{MonteCarloConfig, MonteCarloProjector, MonteCarloResult, PercentileBand};
pub use stress::{
    default_scenarios, BucketImpacts, StressResult, StressScenario, StressTester,
};
