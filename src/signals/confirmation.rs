//! Signal Confirmation
//!
//! Multi-signal ensemble agreement. Six independent checks each add a fixed
//! weight when they trigger; an opportunity is confirmed only when enough of
//! them agree AND their combined weight clears a floor.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::indicators::mean;

/// Directional trend label supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl TrendDirection {
    /// True for bullish or bearish
    pub fn is_directional(&self) -> bool {
        !matches!(self, TrendDirection::Neutral)
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Bullish => write!(f, "bullish"),
            TrendDirection::Bearish => write!(f, "bearish"),
            TrendDirection::Neutral => write!(f, "neutral"),
        }
    }
}

/// Market snapshot for confirmation. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationInput {
    #[serde(default)]
    pub opportunity_score: Option<f64>,
    #[serde(default)]
    pub volumes: Vec<f64>,
    /// Accepted for callers that pass a full snapshot; not scored
    #[serde(default)]
    pub prices: Vec<f64>,
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub trend: Option<TrendDirection>,
    #[serde(default)]
    pub momentum: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// The six confirmation checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSignal {
    Technical,
    Volume,
    Momentum,
    Volatility,
    Trend,
    Sentiment,
}

impl ConfirmationSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ConfirmationSignal::Technical => "technical",
            ConfirmationSignal::Volume => "volume",
            ConfirmationSignal::Momentum => "momentum",
            ConfirmationSignal::Volatility => "volatility",
            ConfirmationSignal::Trend => "trend",
            ConfirmationSignal::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for ConfirmationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weight contributed by each triggered check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationWeights {
    pub technical: f64,
    pub volume: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub trend: f64,
    pub sentiment: f64,
}

impl Default for ConfirmationWeights {
    fn default() -> Self {
        Self {
            technical: 1.0,
            volume: 1.0,
            momentum: 1.0,
            volatility: 0.5,
            trend: 1.0,
            sentiment: 0.8,
        }
    }
}

impl ConfirmationWeights {
    pub fn weight(&self, signal: ConfirmationSignal) -> f64 {
        match signal {
            ConfirmationSignal::Technical => self.technical,
            ConfirmationSignal::Volume => self.volume,
            ConfirmationSignal::Momentum => self.momentum,
            ConfirmationSignal::Volatility => self.volatility,
            ConfirmationSignal::Trend => self.trend,
            ConfirmationSignal::Sentiment => self.sentiment,
        }
    }
}

/// Signal confirmation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfirmationConfig {
    /// Minimum number of agreeing checks (clamped to 1..=5)
    pub min_confirmations: usize,
    /// Minimum combined weight of the agreeing checks
    pub min_total_weight: f64,
    pub weights: ConfirmationWeights,
    /// Opportunity score must exceed this
    pub opportunity_threshold: f64,
    /// Latest volume must exceed this multiple of the trailing average
    pub volume_surge_ratio: f64,
    /// Number of preceding observations averaged for the volume baseline
    pub volume_window: usize,
    /// |momentum| must exceed this
    pub momentum_threshold: f64,
    /// Volatility sweet spot, both bounds exclusive
    pub volatility_min: f64,
    pub volatility_max: f64,
    /// |sentiment| must exceed this
    pub sentiment_threshold: f64,
}

impl Default for SignalConfirmationConfig {
    fn default() -> Self {
        Self {
            min_confirmations: 3,
            min_total_weight: 2.5,
            weights: ConfirmationWeights::default(),
            opportunity_threshold: 0.5,
            volume_surge_ratio: 1.5,
            volume_window: 5,
            momentum_threshold: 0.01,
            volatility_min: 0.03,
            volatility_max: 0.08,
            sentiment_threshold: 0.3,
        }
    }
}

/// Confirmation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub confirmed: bool,
    pub count: usize,
    pub total_weight: f64,
    pub min_confirmations: usize,
    pub signals: Vec<ConfirmationSignal>,
    pub reasoning: Vec<String>,
}

/// Signal confirmation scorer
pub struct SignalConfirmation {
    config: SignalConfirmationConfig,
}

impl SignalConfirmation {
    /// Create a scorer with the given configuration
    pub fn new(mut config: SignalConfirmationConfig) -> Self {
        config.min_confirmations = config.min_confirmations.clamp(1, 5);
        Self { config }
    }

    /// Run all six checks against the snapshot
    pub fn evaluate(&self, input: &ConfirmationInput) -> ConfirmationResult {
        let cfg = &self.config;
        let mut signals = vec![];
        let mut reasoning = vec![];

        // Technical: opportunity score
        let opportunity = input.opportunity_score.unwrap_or(0.0);
        if opportunity > cfg.opportunity_threshold {
            signals.push(ConfirmationSignal::Technical);
            reasoning.push(format!("Technical opportunity: {:.2}", opportunity));
        }

        // Volume: latest bar against the bars before it
        if let Some(surge) = self.volume_surge(&input.volumes) {
            signals.push(ConfirmationSignal::Volume);
            reasoning.push(format!(
                "Volume surge: {:.1}% above average",
                (surge - 1.0) * 100.0
            ));
        }

        let momentum = input.momentum.unwrap_or(0.0);
        if momentum.abs() > cfg.momentum_threshold {
            signals.push(ConfirmationSignal::Momentum);
            reasoning.push(format!("Strong momentum: {:.2}%", momentum * 100.0));
        }

        // Volatility: neither dead nor chaotic
        let volatility = input.volatility.unwrap_or(0.0);
        if volatility > cfg.volatility_min && volatility < cfg.volatility_max {
            signals.push(ConfirmationSignal::Volatility);
            reasoning.push(format!("Optimal volatility: {:.2}%", volatility * 100.0));
        }

        if let Some(trend) = input.trend.filter(TrendDirection::is_directional) {
            signals.push(ConfirmationSignal::Trend);
            reasoning.push(format!("Clear trend: {}", trend));
        }

        let sentiment = input.sentiment.unwrap_or(0.0);
        if sentiment.abs() > cfg.sentiment_threshold {
            signals.push(ConfirmationSignal::Sentiment);
            reasoning.push(format!("Strong sentiment: {:.1}%", sentiment * 100.0));
        }

        let total_weight: f64 = signals.iter().map(|s| cfg.weights.weight(*s)).sum();
        let confirmed =
            signals.len() >= cfg.min_confirmations && total_weight >= cfg.min_total_weight;

        ConfirmationResult {
            confirmed,
            count: signals.len(),
            total_weight,
            min_confirmations: cfg.min_confirmations,
            signals,
            reasoning,
        }
    }

    /// Ratio of the latest volume to its baseline, when it counts as a surge
    fn volume_surge(&self, volumes: &[f64]) -> Option<f64> {
        let window = self.config.volume_window.max(1);
        if volumes.len() < window {
            return None;
        }

        let (latest, history) = volumes.split_last()?;
        let baseline = &history[history.len().saturating_sub(window)..];
        let avg = mean(baseline)?;
        if avg <= 0.0 {
            return None;
        }

        (*latest > avg * self.config.volume_surge_ratio).then_some(latest / avg)
    }

    /// Set the minimum number of agreeing checks, clamped to 1..=5
    pub fn set_min_confirmations(&mut self, count: usize) {
        self.config.min_confirmations = count.clamp(1, 5);
    }

    pub fn min_confirmations(&self) -> usize {
        self.config.min_confirmations
    }

    pub fn config(&self) -> &SignalConfirmationConfig {
        &self.config
    }
}

impl Default for SignalConfirmation {
    fn default() -> Self {
        Self::new(SignalConfirmationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_not_confirmed() {
        let scorer = SignalConfirmation::default();
        let result = scorer.evaluate(&ConfirmationInput::default());

        assert!(!result.confirmed);
        assert_eq!(result.count, 0);
        assert_eq!(result.total_weight, 0.0);
        assert!(result.signals.is_empty());
        assert!(result.reasoning.is_empty());
        assert_eq!(result.min_confirmations, 3);
    }

    #[test]
    fn test_five_signal_confirmation() {
        let scorer = SignalConfirmation::default();
        let input = ConfirmationInput {
            opportunity_score: Some(0.6),
            volumes: vec![100.0, 100.0, 100.0, 100.0, 160.0],
            momentum: Some(0.02),
            trend: Some(TrendDirection::Bullish),
            sentiment: Some(0.4),
            ..Default::default()
        };

        let result = scorer.evaluate(&input);
        assert_eq!(
            result.signals,
            vec![
                ConfirmationSignal::Technical,
                ConfirmationSignal::Volume,
                ConfirmationSignal::Momentum,
                ConfirmationSignal::Trend,
                ConfirmationSignal::Sentiment,
            ]
        );
        assert_eq!(result.count, 5);
        assert!((result.total_weight - 4.8).abs() < 1e-9);
        assert!(result.confirmed);
        assert_eq!(result.reasoning.len(), 5);
        assert_eq!(result.reasoning[1], "Volume surge: 60.0% above average");
    }

    #[test]
    fn test_count_without_weight_is_not_enough() {
        // Three signals: volatility 0.5 + sentiment 0.8 + momentum 1.0 = 2.3 < 2.5
        let scorer = SignalConfirmation::default();
        let input = ConfirmationInput {
            volatility: Some(0.05),
            sentiment: Some(-0.5),
            momentum: Some(-0.03),
            ..Default::default()
        };

        let result = scorer.evaluate(&input);
        assert_eq!(result.count, 3);
        assert!((result.total_weight - 2.3).abs() < 1e-9);
        assert!(!result.confirmed);
    }

    #[test]
    fn test_weight_without_count_is_not_enough() {
        let mut scorer = SignalConfirmation::default();
        let input = ConfirmationInput {
            opportunity_score: Some(0.9),
            momentum: Some(0.05),
            trend: Some(TrendDirection::Bearish),
            ..Default::default()
        };
        assert!(scorer.evaluate(&input).confirmed);

        scorer.set_min_confirmations(4);
        let result = scorer.evaluate(&input);
        assert_eq!(result.count, 3);
        assert!(!result.confirmed);
    }

    #[test]
    fn test_neutral_trend_ignored() {
        let scorer = SignalConfirmation::default();
        let input = ConfirmationInput {
            trend: Some(TrendDirection::Neutral),
            ..Default::default()
        };
        assert_eq!(scorer.evaluate(&input).count, 0);
    }

    #[test]
    fn test_volatility_band_is_exclusive() {
        let scorer = SignalConfirmation::default();
        for (vol, expected) in [(0.03, false), (0.031, true), (0.079, true), (0.08, false)] {
            let input = ConfirmationInput {
                volatility: Some(vol),
                ..Default::default()
            };
            let triggered = scorer
                .evaluate(&input)
                .signals
                .contains(&ConfirmationSignal::Volatility);
            assert_eq!(triggered, expected, "volatility {}", vol);
        }
    }

    #[test]
    fn test_volume_needs_full_window() {
        let scorer = SignalConfirmation::default();
        let input = ConfirmationInput {
            volumes: vec![10.0, 10.0, 10.0, 100.0],
            ..Default::default()
        };
        assert_eq!(scorer.evaluate(&input).count, 0);
    }

    #[test]
    fn test_volume_baseline_uses_preceding_window_only() {
        let scorer = SignalConfirmation::default();
        // Old spike outside the 5-bar baseline does not dilute the surge
        let input = ConfirmationInput {
            volumes: vec![1000.0, 100.0, 100.0, 100.0, 100.0, 100.0, 151.0],
            ..Default::default()
        };
        assert!(scorer
            .evaluate(&input)
            .signals
            .contains(&ConfirmationSignal::Volume));

        let flat = ConfirmationInput {
            volumes: vec![100.0, 100.0, 100.0, 100.0, 100.0, 150.0],
            ..Default::default()
        };
        assert!(!scorer
            .evaluate(&flat)
            .signals
            .contains(&ConfirmationSignal::Volume));
    }

    #[test]
    fn test_set_min_confirmations_clamps() {
        let mut scorer = SignalConfirmation::default();
        scorer.set_min_confirmations(0);
        assert_eq!(scorer.min_confirmations(), 1);
        scorer.set_min_confirmations(9);
        assert_eq!(scorer.min_confirmations(), 5);
        scorer.set_min_confirmations(2);
        assert_eq!(scorer.min_confirmations(), 2);
    }

    #[test]
    fn test_deserialize_camel_case_input() {
        let json = r#"{"opportunityScore":0.7,"trend":"bearish","volumes":[1,2,3]}"#;
        let input: ConfirmationInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.opportunity_score, Some(0.7));
        assert_eq!(input.trend, Some(TrendDirection::Bearish));
        assert_eq!(input.volumes.len(), 3);
        assert!(input.sentiment.is_none());
    }
}
