//! Trade-outcome learning
//!
//! Executed trades are turned into a Q-learning transition and appended to a
//! capped, persisted trade history that feeds the agent's statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::q_learning::QLearningAgent;
use super::state::{Action, QState};
use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

/// Side of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn action(&self) -> Action {
        match self {
            TradeSide::Buy => Action::Buy,
            TradeSide::Sell => Action::Sell,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(Error::InvalidInput(format!("Unknown trade side: {}", other))),
        }
    }
}

/// One entry of the trade history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub side: TradeSide,
    /// 1 = filled with output, 0 = filled without output, -1 = failed
    pub pnl: f64,
    pub amount: f64,
}

/// Result of an executed trade as reported by the execution layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    pub side: TradeSide,
    pub success: bool,
    /// Market volume at execution time
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub output_amount: Option<f64>,
}

impl TradeOutcome {
    fn pnl(&self) -> f64 {
        match (self.success, self.output_amount) {
            (false, _) => -1.0,
            (true, Some(out)) if out != 0.0 => 1.0,
            (true, _) => 0.0,
        }
    }
}

/// Trade feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeFeedbackConfig {
    pub success_reward: f64,
    pub failure_reward: f64,
    /// Trend assumed for the pre-trade state (positive for buys)
    pub trend_proxy: f64,
    /// Next-state trend as a fraction of the pre-trade trend
    pub trend_decay: f64,
    /// Volume strictly above this counts as a spike
    pub volume_spike_threshold: f64,
    pub neutral_rsi: f64,
    /// Most recent trades kept in the history
    pub history_limit: usize,
    pub storage_key: String,
}

impl Default for TradeFeedbackConfig {
    fn default() -> Self {
        Self {
            success_reward: 10.0,
            failure_reward: -5.0,
            trend_proxy: 0.1,
            trend_decay: 0.9,
            volume_spike_threshold: 1_000_000.0,
            neutral_rsi: 50.0,
            history_limit: 1000,
            storage_key: "trade-history".to_string(),
        }
    }
}

/// Capped trade history backed by the store
pub struct TradeHistory {
    records: VecDeque<TradeRecord>,
    limit: usize,
    key: String,
    store: Arc<dyn KeyValueStore>,
}

impl TradeHistory {
    /// Load the history from the store; unreadable data yields an empty history
    pub fn load(store: Arc<dyn KeyValueStore>, limit: usize, key: impl Into<String>) -> Self {
        let key = key.into();
        let limit = limit.max(1);
        let mut records = VecDeque::new();

        if let Some(bytes) = store.get(&key) {
            match serde_json::from_slice::<Vec<TradeRecord>>(&bytes) {
                Ok(loaded) => {
                    records.extend(loaded);
                    while records.len() > limit {
                        records.pop_front();
                    }
                    debug!(trades = records.len(), "Loaded trade history");
                }
                Err(e) => warn!("Failed to load trade history: {}", e),
            }
        }

        Self {
            records,
            limit,
            key,
            store,
        }
    }

    /// Append a record, dropping the oldest beyond the limit, and persist
    pub fn push(&mut self, record: TradeRecord) {
        self.records.push_back(record);
        while self.records.len() > self.limit {
            self.records.pop_front();
        }
        if let Err(e) = self.persist() {
            warn!("Failed to save trade history: {}", e);
        }
    }

    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.records)?;
        self.store.set(&self.key, &bytes)
    }

    /// Records oldest first
    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(e) = self.store.remove(&self.key) {
            warn!("Failed to remove trade history: {}", e);
        }
    }
}

/// Feeds executed trades back into the agent
pub struct TradeFeedback {
    config: TradeFeedbackConfig,
    history: TradeHistory,
}

impl TradeFeedback {
    pub fn new(config: TradeFeedbackConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let history = TradeHistory::load(store, config.history_limit, config.storage_key.clone());
        Self { config, history }
    }

    /// States before and after the trade
    pub fn transition(&self, outcome: &TradeOutcome) -> (QState, QState) {
        let cfg = &self.config;
        let trend = match outcome.side {
            TradeSide::Buy => cfg.trend_proxy,
            TradeSide::Sell => -cfg.trend_proxy,
        };
        let spike = outcome.total_volume > cfg.volume_spike_threshold;

        (
            QState::new(trend, spike, cfg.neutral_rsi),
            QState::new(trend * cfg.trend_decay, spike, cfg.neutral_rsi),
        )
    }

    pub fn reward(&self, outcome: &TradeOutcome) -> f64 {
        if outcome.success {
            self.config.success_reward
        } else {
            self.config.failure_reward
        }
    }

    /// Update the agent from a trade and append it to the history
    pub fn record(&mut self, agent: &mut QLearningAgent, outcome: &TradeOutcome) -> TradeRecord {
        let (state, next_state) = self.transition(outcome);
        let reward = self.reward(outcome);
        agent.update(&state, outcome.side.action(), reward, &next_state);

        let record = TradeRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            side: outcome.side,
            pnl: outcome.pnl(),
            amount: outcome.amount,
        };
        self.history.push(record.clone());

        info!(
            side = %outcome.side,
            success = outcome.success,
            reward,
            "Trade outcome recorded"
        );
        record
    }

    pub fn history(&self) -> &TradeHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut TradeHistory {
        &mut self.history
    }

    pub fn config(&self) -> &TradeFeedbackConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::q_learning::QLearningConfig;
    use crate::storage::MemoryStore;

    fn outcome(side: TradeSide, success: bool) -> TradeOutcome {
        TradeOutcome {
            side,
            success,
            total_volume: 2_000_000.0,
            amount: 1.5,
            output_amount: Some(42.0),
        }
    }

    fn setup() -> (Arc<MemoryStore>, QLearningAgent, TradeFeedback) {
        let store = Arc::new(MemoryStore::new());
        let agent = QLearningAgent::new(
            QLearningConfig {
                seed: Some(9),
                ..Default::default()
            },
            store.clone(),
        );
        let feedback = TradeFeedback::new(TradeFeedbackConfig::default(), store.clone());
        (store, agent, feedback)
    }

    #[test]
    fn test_successful_buy_rewards_buy() {
        let (_, mut agent, mut feedback) = setup();
        let trade = outcome(TradeSide::Buy, true);
        let record = feedback.record(&mut agent, &trade);

        let (state, _) = feedback.transition(&trade);
        // trend proxy 0.1 sits on the strict boundary and buckets as flat
        assert_eq!(state.key(), "flat_high_neutral");
        assert!((agent.q_values(&state).buy - 1.0).abs() < 1e-12);
        assert_eq!(record.pnl, 1.0);
        assert_eq!(record.side, TradeSide::Buy);
        assert_eq!(record.amount, 1.5);
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn test_failed_sell_penalizes_sell() {
        let (_, mut agent, mut feedback) = setup();
        let mut trade = outcome(TradeSide::Sell, false);
        trade.total_volume = 10.0;
        let record = feedback.record(&mut agent, &trade);

        let (state, next) = feedback.transition(&trade);
        assert!(!state.volume_spike);
        assert!((next.price_trend - (-0.09)).abs() < 1e-12);
        assert!((agent.q_values(&state).sell - (-0.5)).abs() < 1e-12);
        assert_eq!(record.pnl, -1.0);
    }

    #[test]
    fn test_pnl_without_output() {
        let mut trade = outcome(TradeSide::Buy, true);
        trade.output_amount = None;
        assert_eq!(trade.pnl(), 0.0);
        trade.output_amount = Some(0.0);
        assert_eq!(trade.pnl(), 0.0);
    }

    #[test]
    fn test_history_is_capped_and_persisted() {
        let store = Arc::new(MemoryStore::new());
        let mut agent = QLearningAgent::new(QLearningConfig::default(), store.clone());
        let mut feedback = TradeFeedback::new(
            TradeFeedbackConfig {
                history_limit: 3,
                ..Default::default()
            },
            store.clone(),
        );

        for i in 0..5 {
            let mut trade = outcome(TradeSide::Buy, true);
            trade.amount = i as f64;
            feedback.record(&mut agent, &trade);
        }

        let amounts: Vec<f64> = feedback.history().records().iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![2.0, 3.0, 4.0]);

        let reloaded = TradeHistory::load(store, 3, "trade-history");
        assert_eq!(reloaded.records(), feedback.history().records());
    }

    #[test]
    fn test_history_feeds_stats() {
        let (_, mut agent, mut feedback) = setup();
        feedback.record(&mut agent, &outcome(TradeSide::Buy, true));
        feedback.record(&mut agent, &outcome(TradeSide::Sell, false));

        let stats = agent.stats(&feedback.history().records());
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.total_profit, 0.0);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set("trade-history", b"not json").unwrap();
        let history = TradeHistory::load(store, 10, "trade-history");
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear_removes_entry() {
        let (store, mut agent, mut feedback) = setup();
        feedback.record(&mut agent, &outcome(TradeSide::Buy, true));
        assert!(store.get("trade-history").is_some());

        feedback.history_mut().clear();
        assert_eq!(feedback.history().len(), 0);
        assert!(store.get("trade-history").is_none());
    }

    #[test]
    fn test_side_parse() {
        assert_eq!("BUY".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!("sell".parse::<TradeSide>().unwrap().action(), Action::Sell);
        assert!("hold".parse::<TradeSide>().is_err());
    }
}
