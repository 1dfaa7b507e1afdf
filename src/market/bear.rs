//! Bear Market Detector
//!
//! Seven independently optional macro signals, each worth a fixed number of
//! points when active. Points sum to a 0-100 confidence that maps onto a
//! market regime. Every computed state is written through to the store.
//!
//! Thresholds are fixed and live in [`BEAR_RULES`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Store key for the last computed state
pub const BEAR_STATE_KEY: &str = "bear-market-state";

/// Fixed signal weights and thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearMarketRules {
    pub dominance_level: f64,
    pub dominance_change_7d: f64,
    pub dominance_weight: u32,
    pub fear_greed_below: f64,
    pub fear_greed_weight: u32,
    pub below_200w_ma_weight: u32,
    pub altcoin_season_below: f64,
    pub altcoin_season_weight: u32,
    pub volume_change_14d_below: f64,
    pub volume_decline_weight: u32,
    pub funding_rate_below: f64,
    pub funding_rate_weight: u32,
    pub sp500_change_30d_below: f64,
    pub equities_weight: u32,
    pub max_confidence: u32,
    /// Confidence at or above this is `ExtremeBear`
    pub extreme_bear_at: u32,
    /// Confidence at or above this is `Bear`
    pub bear_at: u32,
    /// Confidence strictly below this is `Bull`
    pub bull_below: u32,
}

pub const BEAR_RULES: BearMarketRules = BearMarketRules {
    dominance_level: 54.0,
    dominance_change_7d: 2.0,
    dominance_weight: 20,
    fear_greed_below: 25.0,
    fear_greed_weight: 15,
    below_200w_ma_weight: 20,
    altcoin_season_below: 25.0,
    altcoin_season_weight: 15,
    volume_change_14d_below: -40.0,
    volume_decline_weight: 10,
    funding_rate_below: -0.05,
    funding_rate_weight: 10,
    sp500_change_30d_below: -10.0,
    equities_weight: 10,
    max_confidence: 100,
    extreme_bear_at: 85,
    bear_at: 70,
    bull_below: 30,
};

/// Macro inputs. `btc_price` and `fear_greed_index` are required for a
/// recomputation; the rest are optional and only score when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MacroIndicators {
    pub btc_dominance: Option<f64>,
    #[serde(rename = "btcDominanceChange7d")]
    pub btc_dominance_change_7d: Option<f64>,
    pub fear_greed_index: Option<f64>,
    pub btc_price: Option<f64>,
    #[serde(rename = "btc200WeekMA")]
    pub btc_200_week_ma: Option<f64>,
    pub altcoin_season_index: Option<f64>,
    #[serde(rename = "volumeChange14d")]
    pub volume_change_14d: Option<f64>,
    pub avg_funding_rate: Option<f64>,
    #[serde(rename = "sp500Change30d")]
    pub sp500_change_30d: Option<f64>,
}

/// One evaluated signal, kept for explainability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearMarketSignal {
    pub name: String,
    pub weight: u32,
    pub active: bool,
    pub value: f64,
    pub threshold: f64,
    pub points: u32,
}

impl BearMarketSignal {
    fn evaluate(name: &str, weight: u32, active: bool, value: f64, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            active,
            value,
            threshold,
            points: if active { weight } else { 0 },
        }
    }
}

/// Market regime derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Bull,
    #[default]
    Neutral,
    Bear,
    ExtremeBear,
}

impl MarketStatus {
    pub fn from_confidence(confidence: u32) -> Self {
        if confidence >= BEAR_RULES.extreme_bear_at {
            MarketStatus::ExtremeBear
        } else if confidence >= BEAR_RULES.bear_at {
            MarketStatus::Bear
        } else if confidence < BEAR_RULES.bull_below {
            MarketStatus::Bull
        } else {
            MarketStatus::Neutral
        }
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, MarketStatus::Bear | MarketStatus::ExtremeBear)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Bull => write!(f, "bull"),
            MarketStatus::Neutral => write!(f, "neutral"),
            MarketStatus::Bear => write!(f, "bear"),
            MarketStatus::ExtremeBear => write!(f, "extreme_bear"),
        }
    }
}

/// Bear market assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BearMarketState {
    /// 0 to 100
    pub confidence: u32,
    pub signals: Vec<BearMarketSignal>,
    pub status: MarketStatus,
    pub last_updated: DateTime<Utc>,
}

impl Default for BearMarketState {
    fn default() -> Self {
        Self {
            confidence: 0,
            signals: vec![],
            status: MarketStatus::Neutral,
            last_updated: Utc::now(),
        }
    }
}

/// Bear market detector with write-through persistence
pub struct BearMarketDetector {
    store: Arc<dyn KeyValueStore>,
    state: BearMarketState,
}

impl BearMarketDetector {
    /// Create a detector, restoring the last persisted state if any
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let state = store
            .get(BEAR_STATE_KEY)
            .and_then(|bytes| match serde_json::from_slice(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Discarding unreadable bear market state: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        Self { store, state }
    }

    /// Last computed (or restored) state
    pub fn state(&self) -> &BearMarketState {
        &self.state
    }

    /// Recompute bear confidence from fresh macro data
    ///
    /// Without a BTC price and a Fear & Greed reading the previous state is
    /// returned untouched.
    pub fn calculate_bear_confidence(&mut self, data: &MacroIndicators) -> BearMarketState {
        let (Some(btc_price), Some(fear_greed)) = (data.btc_price, data.fear_greed_index) else {
            warn!("Bear market detector: insufficient market data, keeping previous state");
            return self.state.clone();
        };

        let rules = &BEAR_RULES;
        let mut signals = vec![];

        // 1. BTC dominance rising
        if let (Some(dominance), Some(change)) = (data.btc_dominance, data.btc_dominance_change_7d)
        {
            signals.push(BearMarketSignal::evaluate(
                "BTC Dominance Rising",
                rules.dominance_weight,
                dominance > rules.dominance_level && change > rules.dominance_change_7d,
                dominance,
                rules.dominance_level,
            ));
        }

        // 2. Fear & Greed
        signals.push(BearMarketSignal::evaluate(
            "Fear & Greed Index",
            rules.fear_greed_weight,
            fear_greed < rules.fear_greed_below,
            fear_greed,
            rules.fear_greed_below,
        ));

        // 3. BTC below 200-week MA
        if let Some(ma) = data.btc_200_week_ma {
            signals.push(BearMarketSignal::evaluate(
                "BTC below 200-week MA",
                rules.below_200w_ma_weight,
                btc_price < ma,
                btc_price,
                ma,
            ));
        }

        // 4. Altcoin season
        if let Some(index) = data.altcoin_season_index {
            signals.push(BearMarketSignal::evaluate(
                "Altcoin Season Index",
                rules.altcoin_season_weight,
                index < rules.altcoin_season_below,
                index,
                rules.altcoin_season_below,
            ));
        }

        // 5. Volume decline
        if let Some(change) = data.volume_change_14d {
            signals.push(BearMarketSignal::evaluate(
                "Volume Decline",
                rules.volume_decline_weight,
                change < rules.volume_change_14d_below,
                change,
                rules.volume_change_14d_below,
            ));
        }

        // 6. Funding rate
        if let Some(rate) = data.avg_funding_rate {
            signals.push(BearMarketSignal::evaluate(
                "Funding Rate Negative",
                rules.funding_rate_weight,
                rate < rules.funding_rate_below,
                rate,
                rules.funding_rate_below,
            ));
        }

        // 7. Equities
        if let Some(change) = data.sp500_change_30d {
            signals.push(BearMarketSignal::evaluate(
                "Stock Market Correlation",
                rules.equities_weight,
                change < rules.sp500_change_30d_below,
                change,
                rules.sp500_change_30d_below,
            ));
        }

        let total_points: u32 = signals.iter().map(|s| s.points).sum();
        let confidence = total_points.min(rules.max_confidence);

        let state = BearMarketState {
            confidence,
            signals,
            status: MarketStatus::from_confidence(confidence),
            last_updated: Utc::now(),
        };

        debug!(
            confidence = state.confidence,
            status = %state.status,
            "Bear market confidence updated"
        );

        self.persist(&state);
        self.state = state.clone();
        state
    }

    fn persist(&self, state: &BearMarketState) {
        let result = serde_json::to_vec(state)
            .map_err(crate::error::Error::from)
            .and_then(|bytes| self.store.set(BEAR_STATE_KEY, &bytes));
        if let Err(e) = result {
            warn!("Failed to persist bear market state: {}", e);
        }
    }
}
