//! Dump Risk Detector
//!
//! Early exit protection. Three additive risk factors (volume dry-up,
//! bearish RSI divergence, negative sentiment) combine into a capped score
//! that is compared against an exit threshold.

use serde::{Deserialize, Serialize};

use super::indicators::{mean, relative_strength_index, window_max};

/// Dump risk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpRiskConfig {
    /// Exit when the score is strictly above this (clamped to 0.1..=1.0)
    pub threshold: f64,
    /// Minimum price and volume observations before scoring
    pub min_history: usize,
    /// Recent volume below this fraction of the prior window is a dry-up
    pub volume_dry_up_ratio: f64,
    /// Bars per volume window (recent and prior)
    pub volume_window: usize,
    pub volume_dry_up_weight: f64,
    /// Number of price changes in the RSI window
    pub rsi_period: usize,
    /// Price making highs with RSI below this is a divergence
    pub rsi_divergence_ceiling: f64,
    /// Bars per price-high window (recent and prior)
    pub price_high_window: usize,
    pub rsi_divergence_weight: f64,
    /// Sentiment below this adds risk
    pub sentiment_exit_threshold: f64,
    pub sentiment_weight: f64,
}

impl Default for DumpRiskConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_history: 10,
            volume_dry_up_ratio: 0.9,
            volume_window: 3,
            volume_dry_up_weight: 0.5,
            rsi_period: 13,
            rsi_divergence_ceiling: 60.0,
            price_high_window: 5,
            rsi_divergence_weight: 0.3,
            sentiment_exit_threshold: -0.3,
            sentiment_weight: 0.2,
        }
    }
}

/// Price/volume history for one asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpRiskState {
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// Magnitude of each triggered factor; zero when the factor did not fire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRiskFactors {
    /// Percentage drop of recent volume against the prior window
    pub volume_dry_up: f64,
    /// RSI points below the divergence ceiling
    pub rsi_divergence: f64,
    /// The offending sentiment value
    pub sentiment: f64,
}

/// Dump risk outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRiskResult {
    /// 0.0 to 1.0
    pub risk_score: f64,
    pub factors: DumpRiskFactors,
    pub should_exit: bool,
    pub reasoning: Vec<String>,
}

/// Dump risk detector
pub struct DumpRiskDetector {
    config: DumpRiskConfig,
}

impl DumpRiskDetector {
    pub fn new(mut config: DumpRiskConfig) -> Self {
        config.threshold = config.threshold.clamp(0.1, 1.0);
        Self { config }
    }

    /// Score dump risk for the given history
    pub fn detect_dump_risk(&self, state: &DumpRiskState) -> DumpRiskResult {
        let cfg = &self.config;
        let mut factors = DumpRiskFactors::default();
        let mut reasoning = vec![];

        if state.prices.len() < cfg.min_history || state.volumes.len() < cfg.min_history {
            return DumpRiskResult {
                risk_score: 0.0,
                factors,
                should_exit: false,
                reasoning: vec!["Insufficient data for dump risk detection".to_string()],
            };
        }

        let mut risk = 0.0;

        // Factor 1: volume dry-up
        if let Some(drop_pct) = self.volume_dry_up(&state.volumes) {
            risk += cfg.volume_dry_up_weight;
            factors.volume_dry_up = drop_pct;
            reasoning.push(format!("Volume dry-up: {:.1}% decrease", drop_pct));
        }

        // Factor 2: price making new highs while RSI lags
        if let Some(rsi) = self.bearish_divergence(&state.prices) {
            risk += cfg.rsi_divergence_weight;
            factors.rsi_divergence = cfg.rsi_divergence_ceiling - rsi;
            reasoning.push(format!("RSI divergence: price up but RSI down ({:.1})", rsi));
        }

        // Factor 3: sentiment
        let sentiment = state.sentiment.unwrap_or(0.0);
        if sentiment < cfg.sentiment_exit_threshold {
            risk += cfg.sentiment_weight;
            factors.sentiment = sentiment;
            reasoning.push(format!("Negative sentiment: {:.1}%", sentiment * 100.0));
        }

        let risk_score = f64::min(1.0, risk);

        DumpRiskResult {
            risk_score,
            factors,
            should_exit: risk_score > cfg.threshold,
            reasoning,
        }
    }

    /// Percentage drop of the recent volume window, if it counts as a dry-up
    fn volume_dry_up(&self, volumes: &[f64]) -> Option<f64> {
        let window = self.config.volume_window.max(1);
        if volumes.len() < window * 2 {
            return None;
        }

        let recent = mean(&volumes[volumes.len() - window..])?;
        let prior = mean(&volumes[volumes.len() - window * 2..volumes.len() - window])?;
        if prior <= 0.0 || recent >= prior * self.config.volume_dry_up_ratio {
            return None;
        }

        Some((1.0 - recent / prior) * 100.0)
    }

    /// RSI value when the latest price window makes a higher high than the
    /// previous one while RSI stays under the ceiling
    fn bearish_divergence(&self, prices: &[f64]) -> Option<f64> {
        let window = self.config.price_high_window.max(1);
        if prices.len() < window * 2 {
            return None;
        }

        let rsi = relative_strength_index(prices, self.config.rsi_period)?;
        let recent_high = window_max(&prices[prices.len() - window..])?;
        let prior_high = window_max(&prices[prices.len() - window * 2..prices.len() - window])?;

        (recent_high > prior_high && rsi < self.config.rsi_divergence_ceiling).then_some(rsi)
    }

    /// Set the exit threshold, clamped to 0.1..=1.0
    pub fn set_threshold(&mut self, threshold: f64) {
        self.config.threshold = threshold.clamp(0.1, 1.0);
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }
}

impl Default for DumpRiskDetector {
    fn default() -> Self {
        Self::new(DumpRiskConfig::default())
    }
}
