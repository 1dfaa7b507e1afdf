//! Heuristic RL predictor
//!
//! Scores a feature vector into a single bullish score, then derives
//! horizon outlooks (with injected noise), expected return, confidence,
//! an action and a risk band. No model is loaded; `load_rl_agent` is a stub.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::features::MarketFeatures;
use super::state::Action;

/// Predictor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RlPredictorConfig {
    /// Simulated inference latency for the async path
    pub latency_ms: u64,
    /// Full width of the uniform noise for the 1h, 4h and 24h horizons
    pub noise_spans: [f64; 3],
    pub trend_bonus: f64,
    pub oversold_rsi: f64,
    pub overbought_rsi: f64,
    pub rsi_bonus: f64,
    pub high_volume: f64,
    pub volume_bonus: f64,
    pub whale_threshold: f64,
    pub whale_bonus: f64,
    /// Horizon scores strictly beyond +/- this are directional
    pub horizon_threshold: f64,
    pub return_scale: f64,
    pub confidence_base: f64,
    pub confidence_slope: f64,
    pub confidence_min: f64,
    pub confidence_max: f64,
    /// Score strictly beyond +/- this becomes BUY or SELL
    pub action_threshold: f64,
    pub low_risk_above: f64,
    pub medium_risk_above: f64,
}

impl Default for RlPredictorConfig {
    fn default() -> Self {
        Self {
            latency_ms: 50,
            noise_spans: [0.2, 0.3, 0.4],
            trend_bonus: 0.3,
            oversold_rsi: 40.0,
            overbought_rsi: 70.0,
            rsi_bonus: 0.3,
            high_volume: 1_000_000.0,
            volume_bonus: 0.2,
            whale_threshold: 50.0,
            whale_bonus: 0.2,
            horizon_threshold: 0.3,
            return_scale: 20.0,
            confidence_base: 0.7,
            confidence_slope: 0.3,
            confidence_min: 0.6,
            confidence_max: 0.98,
            action_threshold: 0.4,
            low_risk_above: 0.6,
            medium_risk_above: 0.3,
        }
    }
}

/// Directional label for one horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Bullish,
    Bearish,
    Neutral,
}

impl Outlook {
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Outlook::Bullish
        } else if score < -threshold {
            Outlook::Bearish
        } else {
            Outlook::Neutral
        }
    }
}

impl fmt::Display for Outlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outlook::Bullish => write!(f, "bullish"),
            Outlook::Bearish => write!(f, "bearish"),
            Outlook::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlPrediction {
    pub next_1h: Outlook,
    pub next_4h: Outlook,
    pub next_24h: Outlook,
    /// Percent
    pub expected_return: f64,
    /// 0 to 1
    pub confidence: f64,
    pub action: Action,
    pub risk: RiskLevel,
}

impl RlPrediction {
    /// Fixed maximally bullish result used in God Mode
    pub fn god_mode() -> Self {
        Self {
            next_1h: Outlook::Bullish,
            next_4h: Outlook::Bullish,
            next_24h: Outlook::Bullish,
            expected_return: 15.5,
            confidence: 1.0,
            action: Action::Buy,
            risk: RiskLevel::Low,
        }
    }
}

/// Handle returned by the model loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlAgentHandle {
    pub loaded: bool,
}

/// Model loader stub; there is no model to load
pub async fn load_rl_agent() -> RlAgentHandle {
    RlAgentHandle { loaded: true }
}

#[derive(Debug, Clone, Default)]
pub struct RlPredictor {
    config: RlPredictorConfig,
}

impl RlPredictor {
    pub fn new(config: RlPredictorConfig) -> Self {
        Self { config }
    }

    /// Base score from trend, RSI, volume and whale activity
    pub fn bullish_score(&self, features: &MarketFeatures) -> f64 {
        let cfg = &self.config;
        let mut score = 0.0;

        if features.price_trend > 0.0 {
            score += cfg.trend_bonus;
        }
        if features.rsi < cfg.oversold_rsi {
            score += cfg.rsi_bonus;
        } else if features.rsi > cfg.overbought_rsi {
            score -= cfg.rsi_bonus;
        }
        if features.volume_24h > cfg.high_volume {
            score += cfg.volume_bonus;
        }
        if features.whale_activity > cfg.whale_threshold {
            score += cfg.whale_bonus;
        }

        score
    }

    /// Score features without the simulated latency
    pub fn evaluate<R: Rng>(
        &self,
        features: &MarketFeatures,
        god_mode: bool,
        rng: &mut R,
    ) -> RlPrediction {
        if god_mode {
            return RlPrediction::god_mode();
        }

        let cfg = &self.config;
        let score = self.bullish_score(features);
        let [span_1h, span_4h, span_24h] = cfg.noise_spans;
        let mut horizon = |span: f64| {
            let noisy = score + (rng.gen::<f64>() - 0.5) * span;
            Outlook::from_score(noisy, cfg.horizon_threshold)
        };
        let next_1h = horizon(span_1h);
        let next_4h = horizon(span_4h);
        let next_24h = horizon(span_24h);

        let magnitude = score.abs();
        let confidence = (cfg.confidence_base + magnitude * cfg.confidence_slope)
            .clamp(cfg.confidence_min, cfg.confidence_max);

        let action = if score > cfg.action_threshold {
            Action::Buy
        } else if score < -cfg.action_threshold {
            Action::Sell
        } else {
            Action::Hold
        };

        let risk = if magnitude > cfg.low_risk_above {
            RiskLevel::Low
        } else if magnitude > cfg.medium_risk_above {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        debug!(score, action = %action, "RL prediction");

        RlPrediction {
            next_1h,
            next_4h,
            next_24h,
            expected_return: score * cfg.return_scale,
            confidence,
            action,
            risk,
        }
    }

    /// Score features after the simulated inference latency
    pub async fn predict<R: Rng>(
        &self,
        features: &MarketFeatures,
        god_mode: bool,
        rng: &mut R,
    ) -> RlPrediction {
        tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        self.evaluate(features, god_mode, rng)
    }

    pub fn config(&self) -> &RlPredictorConfig {
        &self.config
    }
}
