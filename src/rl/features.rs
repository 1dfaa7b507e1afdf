//! Market feature extraction
//!
//! Normalizes a raw market snapshot into the feature vector consumed by the
//! predictor and the sentiment advisor.

use serde::{Deserialize, Serialize};

use super::state::QState;

/// Raw market readings; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketSnapshot {
    /// Percent change over 24h
    #[serde(rename = "priceChange24h")]
    pub price_change_24h: Option<f64>,
    /// USD volume over 24h
    #[serde(rename = "volume24h")]
    pub volume_24h: Option<f64>,
    pub rsi: Option<f64>,
    pub liquidity: Option<f64>,
    pub whale_activity: Option<f64>,
    pub social_sentiment: Option<f64>,
}

/// Normalized features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketFeatures {
    /// -1 to 1
    pub price_trend: f64,
    /// USD volume
    #[serde(rename = "volume24h")]
    pub volume_24h: f64,
    /// 0 to 100
    pub rsi: f64,
    /// 0 to 1
    pub volatility: f64,
    /// USD liquidity
    pub liquidity: f64,
    /// 0 to 100
    pub whale_activity: f64,
    /// -100 to 100
    pub social_sentiment: f64,
}

impl MarketFeatures {
    /// Q-learning state for these features
    pub fn q_state(&self, volume_spike_threshold: f64) -> QState {
        QState::new(
            self.price_trend,
            self.volume_24h > volume_spike_threshold,
            self.rsi,
        )
    }
}

pub fn extract_market_features(snapshot: &MarketSnapshot) -> MarketFeatures {
    let price_change = snapshot.price_change_24h.unwrap_or(0.0);

    MarketFeatures {
        price_trend: (price_change / 100.0).clamp(-1.0, 1.0),
        volume_24h: snapshot.volume_24h.unwrap_or(0.0),
        rsi: snapshot.rsi.unwrap_or(50.0).clamp(0.0, 100.0),
        volatility: f64::min(1.0, price_change.abs() / 100.0),
        liquidity: snapshot.liquidity.unwrap_or(0.0),
        whale_activity: snapshot.whale_activity.unwrap_or(0.0),
        social_sentiment: snapshot.social_sentiment.unwrap_or(0.0),
    }
}
