//! Sentiment advisor
//!
//! Condenses market features into a -100..100 sentiment reading with an
//! outlook, a confidence figure, reasoning lines and a next-move hint.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::rl::features::MarketFeatures;

/// Advisor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Full width of the uniform noise added to the raw sentiment
    pub noise_span: f64,
    /// 24h volume strictly above this is a spike
    pub volume_spike_threshold: f64,
    /// Price used for the buy target when none is supplied
    pub default_mid_price: f64,
    pub target_multiplier: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            noise_span: 10.0,
            volume_spike_threshold: 1_000_000.0,
            default_mid_price: 150.0,
            target_multiplier: 1.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentOutlook {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl SentimentOutlook {
    pub fn from_sentiment(sentiment: f64) -> Self {
        if sentiment > 70.0 {
            SentimentOutlook::StrongBullish
        } else if sentiment > 20.0 {
            SentimentOutlook::Bullish
        } else if sentiment < -70.0 {
            SentimentOutlook::StrongBearish
        } else if sentiment < -20.0 {
            SentimentOutlook::Bearish
        } else {
            SentimentOutlook::Neutral
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, SentimentOutlook::StrongBullish | SentimentOutlook::Bullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, SentimentOutlook::StrongBearish | SentimentOutlook::Bearish)
    }
}

impl fmt::Display for SentimentOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentOutlook::StrongBullish => "strong_bullish",
            SentimentOutlook::Bullish => "bullish",
            SentimentOutlook::Neutral => "neutral",
            SentimentOutlook::Bearish => "bearish",
            SentimentOutlook::StrongBearish => "strong_bearish",
        };
        f.write_str(s)
    }
}

/// Advisor readout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSentiment {
    /// -100 to 100
    pub sentiment: f64,
    pub outlook: SentimentOutlook,
    /// 60 to 100
    pub confidence: f64,
    /// 50 to 100
    pub signal_strength: f64,
    pub reasoning: Vec<String>,
    pub next_move: String,
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAdvisor {
    config: AdvisorConfig,
}

impl SentimentAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    pub fn assess<R: Rng>(
        &self,
        features: &MarketFeatures,
        god_mode: bool,
        mid_price: Option<f64>,
        rng: &mut R,
    ) -> AdvisorSentiment {
        let cfg = &self.config;
        let trend = features.price_trend;
        let rsi = features.rsi;
        let volume_spike = features.volume_24h > cfg.volume_spike_threshold;

        let rsi_term = if rsi < 30.0 {
            25.0
        } else if rsi > 70.0 {
            -25.0
        } else {
            0.0
        };
        let raw = trend * 50.0
            + if volume_spike { 20.0 } else { -10.0 }
            + rsi_term
            + (rng.gen::<f64>() - 0.5) * cfg.noise_span;
        let sentiment = raw.clamp(-100.0, 100.0);
        let outlook = SentimentOutlook::from_sentiment(sentiment);

        let (confidence, signal_strength) = if god_mode {
            (100.0, 100.0)
        } else {
            (
                f64::max(60.0, 85.0 + sentiment.abs() / 4.0).min(100.0),
                f64::max(50.0, sentiment.abs()),
            )
        };

        let mut reasoning = Vec::new();
        if volume_spike {
            reasoning.push(format!(
                "Volume spike {:.0}%",
                features.volume_24h / 1_000_000.0 * 100.0
            ));
        }
        if rsi < 30.0 {
            reasoning.push("RSI oversold → bounce incoming".to_string());
        }
        if rsi > 70.0 {
            reasoning.push("RSI overbought → pullback expected".to_string());
        }
        if trend > 0.3 {
            reasoning.push("Strong uptrend detected".to_string());
        }
        if trend < -0.3 {
            reasoning.push("Downtrend forming".to_string());
        }
        if features.whale_activity > 70.0 {
            reasoning.push("Whale accumulation detected".to_string());
        }
        if reasoning.is_empty() {
            reasoning.push("Market consolidating".to_string());
        }

        let next_move = if outlook.is_bullish() {
            let mid = mid_price.unwrap_or(cfg.default_mid_price);
            format!("BUY NOW → TARGET ${:.2}", mid * cfg.target_multiplier)
        } else if outlook.is_bearish() {
            "HOLD CASH → WAIT FOR ENTRY".to_string()
        } else {
            "MONITOR CLOSELY".to_string()
        };

        debug!(sentiment, outlook = %outlook, "Advisor sentiment");

        AdvisorSentiment {
            sentiment,
            outlook,
            confidence,
            signal_strength,
            reasoning,
            next_move,
        }
    }
}
