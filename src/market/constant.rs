//! General constant enums used across the analytics engine.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Direction of a ledger trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    /// Buy shares
    Buy,
    /// Sell shares
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Trading strategy applied by the backtest simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Buy once on the first trading day and hold
    BuyHold,
    /// Periodically liquidate and re-buy equal dollar amounts
    EqualWeightRebalance,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::BuyHold => write!(f, "buy_hold"),
            StrategyKind::EqualWeightRebalance => write!(f, "equal_weight_rebalance"),
        }
    }
}

/// Rebalancing cadence for the rebalancing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Monthly,
    Quarterly,
}

impl RebalanceFrequency {
    /// Period key for a date: two dates share a key iff they fall in the
    /// same rebalancing period.
    pub fn period_key(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            RebalanceFrequency::Monthly => (date.year(), date.month()),
            RebalanceFrequency::Quarterly => (date.year(), (date.month() - 1) / 3 + 1),
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceFrequency::Monthly => write!(f, "monthly"),
            RebalanceFrequency::Quarterly => write!(f, "quarterly"),
        }
    }
}

/// Asset bucket used by the stress tester and the regime-tilt optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetBucket {
    Equity,
    Bond,
    Commodity,
    Crypto,
    Other,
}

impl fmt::Display for AssetBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetBucket::Equity => write!(f, "equity"),
            AssetBucket::Bond => write!(f, "bond"),
            AssetBucket::Commodity => write!(f, "commodity"),
            AssetBucket::Crypto => write!(f, "crypto"),
            AssetBucket::Other => write!(f, "other"),
        }
    }
}

/// Qualitative volatility level of a macro regime period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

/// Default ticker-to-bucket membership table.
static DEFAULT_BUCKETS: LazyLock<HashMap<&'static str, AssetBucket>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    for ticker in [
        "SPY", "VOO", "VTI", "QQQ", "IWM", "DIA", "EFA", "EEM", "AAPL", "MSFT", "GOOGL",
        "AMZN", "NVDA", "META", "TSLA", "JPM", "XOM", "ARKK", "AMD", "CRM", "SHOP",
    ] {
        map.insert(ticker, AssetBucket::Equity);
    }

    for ticker in ["TLT", "IEF", "SHY", "BND", "AGG", "LQD", "HYG", "TIP", "VGIT", "VGLT"] {
        map.insert(ticker, AssetBucket::Bond);
    }

    for ticker in ["GLD", "IAU", "SLV", "SGOL", "DBC", "PDBC", "USO", "UNG"] {
        map.insert(ticker, AssetBucket::Commodity);
    }

    for ticker in ["BTC-USD", "ETH-USD", "GBTC", "BITO", "ETHE"] {
        map.insert(ticker, AssetBucket::Crypto);
    }

    map
});

/// Classify a ticker into its default asset bucket.
///
/// Unknown tickers fall into [`AssetBucket::Other`].
pub fn default_bucket(ticker: &str) -> AssetBucket {
    DEFAULT_BUCKETS
        .get(ticker.to_uppercase().as_str())
        .copied()
        .unwrap_or(AssetBucket::Other)
}

/// Default ticker-to-bucket table as an owned map, for callers that want to
/// start from the defaults and override entries.
pub fn default_bucket_map() -> HashMap<String, AssetBucket> {
    DEFAULT_BUCKETS
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}
