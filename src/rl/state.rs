//! State and action space for the Q-learning agent
//!
//! Continuous market readings are discretized into at most 18 buckets:
//! trend (3) x volume (2) x RSI level (3).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// All actions in tie-break order
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            other => Err(Error::InvalidInput(format!("Unknown action: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendBucket {
    Up,
    Down,
    Flat,
}

impl TrendBucket {
    /// Strictly beyond +/-0.1 counts as a trend
    pub fn from_trend(price_trend: f64) -> Self {
        if price_trend > 0.1 {
            TrendBucket::Up
        } else if price_trend < -0.1 {
            TrendBucket::Down
        } else {
            TrendBucket::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendBucket::Up => "up",
            TrendBucket::Down => "down",
            TrendBucket::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeBucket {
    High,
    Normal,
}

impl VolumeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeBucket::High => "high",
            VolumeBucket::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsiBucket {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiBucket {
    pub fn from_rsi(rsi: f64) -> Self {
        if rsi > 70.0 {
            RsiBucket::Overbought
        } else if rsi < 30.0 {
            RsiBucket::Oversold
        } else {
            RsiBucket::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RsiBucket::Overbought => "overbought",
            RsiBucket::Oversold => "oversold",
            RsiBucket::Neutral => "neutral",
        }
    }
}

/// Market observation fed to the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QState {
    /// -1.0 to 1.0
    pub price_trend: f64,
    pub volume_spike: bool,
    /// 0 to 100
    pub rsi: f64,
    /// Informational; not part of the state key
    #[serde(default)]
    pub position_size: Option<f64>,
}

impl QState {
    pub fn new(price_trend: f64, volume_spike: bool, rsi: f64) -> Self {
        Self {
            price_trend,
            volume_spike,
            rsi,
            position_size: None,
        }
    }

    pub fn buckets(&self) -> (TrendBucket, VolumeBucket, RsiBucket) {
        let volume = if self.volume_spike {
            VolumeBucket::High
        } else {
            VolumeBucket::Normal
        };
        (
            TrendBucket::from_trend(self.price_trend),
            volume,
            RsiBucket::from_rsi(self.rsi),
        )
    }

    /// Q-table key, e.g. `up_high_overbought`
    pub fn key(&self) -> String {
        let (trend, volume, rsi) = self.buckets();
        format!("{}_{}_{}", trend.as_str(), volume.as_str(), rsi.as_str())
    }
}

/// Action values for one state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionValues {
    #[serde(rename = "BUY")]
    pub buy: f64,
    #[serde(rename = "SELL")]
    pub sell: f64,
    #[serde(rename = "HOLD")]
    pub hold: f64,
}

impl ActionValues {
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Buy => self.buy,
            Action::Sell => self.sell,
            Action::Hold => self.hold,
        }
    }

    pub fn set(&mut self, action: Action, value: f64) {
        match action {
            Action::Buy => self.buy = value,
            Action::Sell => self.sell = value,
            Action::Hold => self.hold = value,
        }
    }

    /// Highest-valued action; ties go to the earlier of BUY, SELL, HOLD
    pub fn best(&self) -> Action {
        Action::ALL
            .into_iter()
            .fold(Action::Buy, |best, action| {
                if self.get(action) > self.get(best) {
                    action
                } else {
                    best
                }
            })
    }

    pub fn max(&self) -> f64 {
        self.buy.max(self.sell).max(self.hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_state_key() {
        assert_eq!(QState::new(0.5, true, 80.0).key(), "up_high_overbought");
        assert_eq!(QState::new(-0.5, false, 20.0).key(), "down_normal_oversold");
        assert_eq!(QState::new(0.0, false, 50.0).key(), "flat_normal_neutral");
    }

    #[test]
    fn test_bucket_thresholds_are_strict() {
        assert_eq!(TrendBucket::from_trend(0.1), TrendBucket::Flat);
        assert_eq!(TrendBucket::from_trend(-0.1), TrendBucket::Flat);
        assert_eq!(TrendBucket::from_trend(0.11), TrendBucket::Up);
        assert_eq!(RsiBucket::from_rsi(70.0), RsiBucket::Neutral);
        assert_eq!(RsiBucket::from_rsi(30.0), RsiBucket::Neutral);
        assert_eq!(RsiBucket::from_rsi(70.1), RsiBucket::Overbought);
        assert_eq!(RsiBucket::from_rsi(29.9), RsiBucket::Oversold);
    }

    #[test]
    fn test_at_most_18_keys() {
        let mut keys = HashSet::new();
        for trend in [-1.0, -0.2, 0.0, 0.2, 1.0] {
            for spike in [true, false] {
                for rsi in [0.0, 25.0, 50.0, 75.0, 100.0] {
                    keys.insert(QState::new(trend, spike, rsi).key());
                }
            }
        }
        assert_eq!(keys.len(), 18);
    }

    #[test]
    fn test_position_size_not_in_key() {
        let mut state = QState::new(0.3, false, 50.0);
        let key = state.key();
        state.position_size = Some(5.0);
        assert_eq!(state.key(), key);
    }

    #[test]
    fn test_best_action_tie_break() {
        assert_eq!(ActionValues::default().best(), Action::Buy);

        let values = ActionValues {
            buy: 0.0,
            sell: 1.0,
            hold: 1.0,
        };
        assert_eq!(values.best(), Action::Sell);

        let values = ActionValues {
            buy: -1.0,
            sell: -2.0,
            hold: -0.5,
        };
        assert_eq!(values.best(), Action::Hold);
        assert_eq!(values.max(), -0.5);
    }

    #[test]
    fn test_action_parse_and_serde() {
        assert_eq!("buy".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!("HOLD".parse::<Action>().unwrap(), Action::Hold);
        assert!("short".parse::<Action>().is_err());
        assert_eq!(serde_json::to_string(&Action::Sell).unwrap(), r#""SELL""#);

        let values: ActionValues =
            serde_json::from_str(r#"{"BUY":0.1,"SELL":0,"HOLD":-2}"#).unwrap();
        assert_eq!(values.get(Action::Buy), 0.1);
        assert_eq!(values.get(Action::Hold), -2.0);
    }
}
