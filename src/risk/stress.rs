//! Stress testing against canonical historical shock scenarios.
//!
//! Replays a fixed table of historical shocks against the current allocation
//! weights. This is a pure weighted-impact calculation over asset buckets,
//! not a re-simulation of the period.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::market::{default_bucket_map, validate_allocations, AssetBucket, PortfolioAllocation};

/// Impact percentages per asset bucket for one scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketImpacts {
    pub equity: f64,
    pub bond: f64,
    pub commodity: f64,
    pub crypto: f64,
    pub other: f64,
}

impl BucketImpacts {
    /// Impact for one bucket.
    pub fn for_bucket(&self, bucket: AssetBucket) -> f64 {
        match bucket {
            AssetBucket::Equity => self.equity,
            AssetBucket::Bond => self.bond,
            AssetBucket::Commodity => self.commodity,
            AssetBucket::Crypto => self.crypto,
            AssetBucket::Other => self.other,
        }
    }
}

/// One named historical shock scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub description: String,
    pub impacts: BucketImpacts,
}

/// Estimated impact of one scenario on the allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResult {
    pub name: String,
    pub description: String,
    /// Weighted impact in percent of portfolio value
    pub estimated_impact_pct: f64,
}

/// The canonical historical scenario table.
pub fn default_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario {
            name: "2008 Financial Crisis".to_string(),
            description: "Global credit freeze; equities halve while Treasuries rally"
                .to_string(),
            impacts: BucketImpacts {
                equity: -37.0,
                bond: 5.2,
                commodity: -35.6,
                crypto: -55.0,
                other: -15.0,
            },
        },
        StressScenario {
            name: "2020 COVID Crash".to_string(),
            description: "Pandemic shutdown; fastest 30% equity decline on record".to_string(),
            impacts: BucketImpacts {
                equity: -33.9,
                bond: 8.1,
                commodity: -26.1,
                crypto: -39.0,
                other: -12.0,
            },
        },
        StressScenario {
            name: "Dot-Com Bust".to_string(),
            description: "2000-2002 technology unwind; bonds gain as equities grind down"
                .to_string(),
            impacts: BucketImpacts {
                equity: -44.7,
                bond: 11.4,
                commodity: 4.9,
                crypto: -60.0,
                other: -8.0,
            },
        },
        StressScenario {
            name: "1970s Stagflation".to_string(),
            description: "Persistent inflation with stagnant growth; real assets outperform"
                .to_string(),
            impacts: BucketImpacts {
                equity: -14.3,
                bond: -3.9,
                commodity: 86.4,
                crypto: -45.0,
                other: 2.0,
            },
        },
        StressScenario {
            name: "2022 Rate Shock".to_string(),
            description: "Aggressive tightening; stocks and bonds fall together".to_string(),
            impacts: BucketImpacts {
                equity: -19.4,
                bond: -17.8,
                commodity: 16.1,
                crypto: -64.2,
                other: -10.0,
            },
        },
    ]
}

/// Stress tester over a scenario table and a ticker-to-bucket mapping.
///
/// Both tables are injected at construction so tests can substitute
/// alternates; [`Default`] wires the built-in reference data.
pub struct StressTester {
    scenarios: Vec<StressScenario>,
    buckets: HashMap<String, AssetBucket>,
}

impl StressTester {
    pub fn new(scenarios: Vec<StressScenario>, buckets: HashMap<String, AssetBucket>) -> Self {
        Self { scenarios, buckets }
    }

    /// Load a scenario table from JSON.
    pub fn from_json(json: &str, buckets: HashMap<String, AssetBucket>) -> Result<Self> {
        let scenarios: Vec<StressScenario> = serde_json::from_str(json)
            .map_err(|e| EngineError::input_validation(format!("bad scenario table: {}", e)))?;
        Ok(Self::new(scenarios, buckets))
    }

    /// Bucket for a ticker, defaulting to Other.
    pub fn bucket_for(&self, ticker: &str) -> AssetBucket {
        self.buckets
            .get(ticker.to_uppercase().as_str())
            .copied()
            .unwrap_or(AssetBucket::Other)
    }

    /// Estimated impact per scenario for the current allocation.
    ///
    /// Impact = sum over tickers of weight x scenario impact for the
    /// ticker's bucket, with weights normalized from percentages.
    pub fn run(&self, allocations: &[PortfolioAllocation]) -> Result<Vec<StressResult>> {
        validate_allocations(allocations)?;

        let total_weight: f64 = allocations.iter().map(|a| a.weight).sum();

        let results = self
            .scenarios
            .iter()
            .map(|scenario| {
                let impact = allocations
                    .iter()
                    .map(|alloc| {
                        let bucket = self.bucket_for(&alloc.ticker);
                        alloc.weight / total_weight * scenario.impacts.for_bucket(bucket)
                    })
                    .sum();
                StressResult {
                    name: scenario.name.clone(),
                    description: scenario.description.clone(),
                    estimated_impact_pct: impact,
                }
            })
            .collect();

        Ok(results)
    }

    /// Scenario table currently in use.
    pub fn scenarios(&self) -> &[StressScenario] {
        &self.scenarios
    }
}

impl Default for StressTester {
    fn default() -> Self {
        Self::new(default_scenarios(), default_bucket_map())
    }
}
