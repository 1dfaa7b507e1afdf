//! Q-Learning agent
//!
//! Tabular Q-learning over the 18 discretized market buckets with
//! epsilon-greedy exploration. The table is flushed to the injected store
//! every `save_interval` updates and reloaded at construction.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::feedback::TradeRecord;
use super::state::{Action, ActionValues, QState};
use crate::error::Result;
use crate::storage::KeyValueStore;

/// Configuration for the Q-learning agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Learning rate (alpha)
    pub learning_rate: f64,
    /// Discount factor (gamma)
    pub discount_factor: f64,
    /// Exploration rate (epsilon)
    pub epsilon: f64,
    /// Flush the table every N updates
    pub save_interval: u64,
    /// Store key for the persisted table
    pub storage_key: String,
    /// Updates that count as 100% learning progress
    pub progress_target: u64,
    /// Fixed seed for exploration; entropy when unset
    pub seed: Option<u64>,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            epsilon: 0.1,
            save_interval: 10,
            storage_key: "qf-qtable".to_string(),
            progress_target: 1000,
            seed: None,
        }
    }
}

/// Persisted form of the table
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QTableSnapshot {
    #[serde(default)]
    q_table: HashMap<String, ActionValues>,
    #[serde(default)]
    total_updates: u64,
    /// Unix millis
    #[serde(default)]
    saved_at: i64,
}

/// Learning statistics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QLearningStats {
    pub total_trades: usize,
    /// Percentage of trades with positive P&L
    pub win_rate: f64,
    pub total_profit: f64,
    pub q_table_size: usize,
    /// 0 to 100
    pub learning_progress: f64,
}

/// Q-table agent
pub struct QLearningAgent {
    config: QLearningConfig,
    q_table: HashMap<String, ActionValues>,
    total_updates: u64,
    rng: StdRng,
    store: Arc<dyn KeyValueStore>,
}

impl QLearningAgent {
    /// Create an agent, restoring any table found in the store
    pub fn new(config: QLearningConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut agent = Self {
            config,
            q_table: HashMap::new(),
            total_updates: 0,
            rng,
            store,
        };
        agent.load();
        agent
    }

    /// Greedy action for the state's bucket
    ///
    /// An unseen bucket is added to the table with all-zero values.
    pub fn best_action(&mut self, state: &QState) -> Action {
        self.q_table.entry(state.key()).or_default().best()
    }

    /// Epsilon-greedy action. God Mode always exploits.
    pub fn action(&mut self, state: &QState, god_mode: bool) -> Action {
        if god_mode {
            return self.best_action(state);
        }

        if self.rng.gen::<f64>() < self.config.epsilon {
            let action = Action::ALL[self.rng.gen_range(0..Action::ALL.len())];
            debug!(action = %action, epsilon = self.config.epsilon, "Exploration: random action");
            return action;
        }

        let action = self.best_action(state);
        debug!(action = %action, "Exploitation: best action");
        action
    }

    /// Apply the Q-learning update for one observed transition
    ///
    /// Q(s,a) += alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))
    pub fn update(&mut self, state: &QState, action: Action, reward: f64, next_state: &QState) {
        let key = state.key();
        let next_key = next_state.key();

        let max_next_q = self.q_table.entry(next_key).or_default().max();
        let values = self.q_table.entry(key).or_default();
        let old_value = values.get(action);
        let new_value = old_value
            + self.config.learning_rate
                * (reward + self.config.discount_factor * max_next_q - old_value);
        values.set(action, new_value);

        self.total_updates += 1;
        debug!(
            state = %state.key(),
            action = %action,
            reward,
            old_value,
            new_value,
            "Q-value updated"
        );

        if self.config.save_interval > 0 && self.total_updates % self.config.save_interval == 0 {
            if let Err(e) = self.flush() {
                warn!("Failed to save Q-table: {}", e);
            }
        }
    }

    /// Action values for a state; zeros for an unseen bucket (not inserted)
    pub fn q_values(&self, state: &QState) -> ActionValues {
        self.q_table
            .get(&state.key())
            .copied()
            .unwrap_or_default()
    }

    /// Statistics over the agent and a trade history
    pub fn stats(&self, trade_history: &[TradeRecord]) -> QLearningStats {
        let total_trades = trade_history.len();
        let wins = trade_history.iter().filter(|t| t.pnl > 0.0).count();
        let total_profit = trade_history.iter().map(|t| t.pnl).sum();
        let win_rate = if total_trades > 0 {
            (wins as f64 / total_trades as f64) * 100.0
        } else {
            0.0
        };

        let target = self.config.progress_target.max(1) as f64;
        QLearningStats {
            total_trades,
            win_rate,
            total_profit,
            q_table_size: self.q_table.len(),
            learning_progress: f64::min(100.0, (self.total_updates as f64 / target) * 100.0),
        }
    }

    /// Number of updates applied since the last reset
    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    /// Number of buckets in the table
    pub fn table_size(&self) -> usize {
        self.q_table.len()
    }

    /// Write the full table to the store now
    pub fn flush(&self) -> Result<()> {
        let snapshot = QTableSnapshot {
            q_table: self.q_table.clone(),
            total_updates: self.total_updates,
            saved_at: Utc::now().timestamp_millis(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        self.store.set(&self.config.storage_key, &bytes)?;
        debug!(
            states = self.q_table.len(),
            updates = self.total_updates,
            "Q-table saved"
        );
        Ok(())
    }

    fn load(&mut self) {
        let Some(bytes) = self.store.get(&self.config.storage_key) else {
            return;
        };

        match serde_json::from_slice::<QTableSnapshot>(&bytes) {
            Ok(snapshot) => {
                self.q_table = snapshot.q_table;
                self.total_updates = snapshot.total_updates;
                info!(
                    states = self.q_table.len(),
                    updates = self.total_updates,
                    "Loaded Q-table"
                );
            }
            Err(e) => {
                warn!("Failed to load Q-table: {}", e);
                self.q_table.clear();
                self.total_updates = 0;
            }
        }
    }

    /// Clear the table, the counter and the persisted entry
    pub fn reset(&mut self) {
        self.q_table.clear();
        self.total_updates = 0;
        if let Err(e) = self.store.remove(&self.config.storage_key) {
            warn!("Failed to remove persisted Q-table: {}", e);
        }
        info!("Q-table reset");
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::rl::feedback::TradeSide;
    use crate::storage::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<Vec<u8>> {
            Some(b"\x00garbage".to_vec())
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(Error::Storage("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".into()))
        }
    }

    fn seeded() -> QLearningConfig {
        QLearningConfig {
            seed: Some(7),
            ..Default::default()
        }
    }

    fn agent() -> (Arc<MemoryStore>, QLearningAgent) {
        let store = Arc::new(MemoryStore::new());
        let agent = QLearningAgent::new(seeded(), store.clone());
        (store, agent)
    }

    fn trade(pnl: f64) -> TradeRecord {
        TradeRecord {
            id: "t".to_string(),
            timestamp: Utc::now(),
            side: TradeSide::Buy,
            pnl,
            amount: 1.0,
        }
    }

    #[test]
    fn test_first_update_value() {
        let (_, mut agent) = agent();
        let s = QState::new(0.5, true, 50.0);
        agent.update(&s, Action::Buy, 1.0, &s);

        let values = agent.q_values(&s);
        assert!((values.buy - 0.1).abs() < 1e-12);
        assert_eq!(values.sell, 0.0);
        assert_eq!(values.hold, 0.0);
        assert_eq!(agent.total_updates(), 1);
    }

    #[test]
    fn test_self_transition_converges_monotonically() {
        let (_, mut agent) = agent();
        let s = QState::new(0.0, false, 50.0);
        let limit = 1.0 / (1.0 - 0.95);

        let mut previous = 0.0;
        for _ in 0..2000 {
            agent.update(&s, Action::Buy, 1.0, &s);
            let value = agent.q_values(&s).buy;
            assert!(value > previous);
            assert!(value < limit);
            previous = value;
        }
        assert!((previous - limit).abs() < 0.01);
    }

    #[test]
    fn test_update_uses_next_state_max() {
        let (_, mut agent) = agent();
        let s = QState::new(0.5, false, 50.0);
        let next = QState::new(-0.5, false, 50.0);

        agent.update(&next, Action::Hold, 10.0, &next);
        let next_max = agent.q_values(&next).max();
        assert!((next_max - 1.0).abs() < 1e-12);

        agent.update(&s, Action::Sell, 0.0, &next);
        // 0.1 * (0 + 0.95 * 1.0 - 0)
        assert!((agent.q_values(&s).sell - 0.095).abs() < 1e-12);
    }

    #[test]
    fn test_update_initializes_both_states() {
        let (_, mut agent) = agent();
        let s = QState::new(0.5, false, 50.0);
        let next = QState::new(-0.5, true, 10.0);
        agent.update(&s, Action::Buy, 1.0, &next);
        assert_eq!(agent.table_size(), 2);
    }

    #[test]
    fn test_best_action_deterministic_and_lazy() {
        let (_, mut agent) = agent();
        let s = QState::new(-0.5, false, 20.0);
        assert_eq!(agent.table_size(), 0);
        assert_eq!(agent.best_action(&s), Action::Buy);
        assert_eq!(agent.table_size(), 1);

        agent.update(&s, Action::Sell, 5.0, &s);
        for _ in 0..10 {
            assert_eq!(agent.best_action(&s), Action::Sell);
        }
    }

    #[test]
    fn test_q_values_does_not_insert() {
        let (_, agent) = agent();
        let values = agent.q_values(&QState::new(0.0, false, 50.0));
        assert_eq!(values, ActionValues::default());
        assert_eq!(agent.table_size(), 0);
    }

    #[test]
    fn test_god_mode_always_exploits() {
        let store = Arc::new(MemoryStore::new());
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                epsilon: 1.0,
                seed: Some(1),
                ..Default::default()
            },
            store,
        );
        let s = QState::new(0.5, true, 50.0);
        agent.update(&s, Action::Hold, 3.0, &s);

        for _ in 0..50 {
            assert_eq!(agent.action(&s, true), agent.best_action(&s));
        }
    }

    #[test]
    fn test_full_exploration_visits_every_action() {
        let store = Arc::new(MemoryStore::new());
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                epsilon: 1.0,
                seed: Some(42),
                ..Default::default()
            },
            store,
        );
        let s = QState::new(0.0, false, 50.0);
        let seen: std::collections::HashSet<Action> =
            (0..200).map(|_| agent.action(&s, false)).collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let store = Arc::new(MemoryStore::new());
        let mut agent = QLearningAgent::new(
            QLearningConfig {
                epsilon: 0.0,
                seed: Some(3),
                ..Default::default()
            },
            store,
        );
        let s = QState::new(0.0, false, 50.0);
        agent.update(&s, Action::Sell, 1.0, &s);
        for _ in 0..50 {
            assert_eq!(agent.action(&s, false), Action::Sell);
        }
    }

    #[test]
    fn test_flush_every_ten_updates() {
        let (store, mut agent) = agent();
        let s = QState::new(0.0, false, 50.0);

        for _ in 0..9 {
            agent.update(&s, Action::Buy, 1.0, &s);
        }
        assert!(store.get("qf-qtable").is_none());

        agent.update(&s, Action::Buy, 1.0, &s);
        let bytes = store.get("qf-qtable").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["totalUpdates"], 10);
        assert!(json["qTable"]["flat_normal_neutral"]["BUY"].as_f64().unwrap() > 0.0);
        assert!(json["savedAt"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_reload_preserves_exact_bits() {
        let (store, mut agent) = agent();
        let s = QState::new(0.0, false, 50.0);
        let next = QState::new(-0.5, false, 50.0);

        // 0.1 * (2 + 0.95 * 0.1 * 1.0) lands on 0.20950000000000002
        agent.update(&next, Action::Hold, 1.0, &next);
        agent.update(&s, Action::Sell, 2.0, &next);
        for _ in 0..25 {
            agent.update(&s, Action::Buy, 0.37, &next);
        }
        agent.flush().unwrap();

        let reloaded = QLearningAgent::new(seeded(), store);
        for state in [&s, &next] {
            let before = agent.q_values(state);
            let after = reloaded.q_values(state);
            for action in Action::ALL {
                assert_eq!(after.get(action).to_bits(), before.get(action).to_bits());
            }
        }
    }

    #[test]
    fn test_roundtrip_through_store() {
        let (store, mut agent) = agent();
        let states = [
            QState::new(0.5, true, 80.0),
            QState::new(-0.5, false, 20.0),
            QState::new(0.0, true, 50.0),
        ];

        agent.reset();
        for (i, s) in states.iter().enumerate() {
            agent.update(s, Action::ALL[i], i as f64 + 1.0, &states[0]);
        }
        agent.flush().unwrap();

        let reloaded = QLearningAgent::new(seeded(), store);
        assert_eq!(reloaded.total_updates(), agent.total_updates());
        for s in &states {
            assert_eq!(reloaded.q_values(s), agent.q_values(s));
        }
    }

    #[test]
    fn test_reset_clears_table_and_store() {
        let (store, mut agent) = agent();
        let s = QState::new(0.0, false, 50.0);
        for _ in 0..10 {
            agent.update(&s, Action::Buy, 1.0, &s);
        }
        assert!(store.get("qf-qtable").is_some());

        agent.reset();
        assert_eq!(agent.table_size(), 0);
        assert_eq!(agent.total_updates(), 0);
        assert!(store.get("qf-qtable").is_none());
    }

    #[test]
    fn test_corrupt_storage_degrades_to_empty() {
        let mut agent = QLearningAgent::new(seeded(), Arc::new(BrokenStore));
        assert_eq!(agent.table_size(), 0);

        // Failed flushes and removes are swallowed
        let s = QState::new(0.0, false, 50.0);
        for _ in 0..10 {
            agent.update(&s, Action::Buy, 1.0, &s);
        }
        assert_eq!(agent.total_updates(), 10);
        agent.reset();
        assert_eq!(agent.table_size(), 0);
    }

    #[test]
    fn test_stats() {
        let (_, mut agent) = agent();
        let empty = agent.stats(&[]);
        assert_eq!(empty.total_trades, 0);
        assert_eq!(empty.win_rate, 0.0);
        assert_eq!(empty.learning_progress, 0.0);

        let s = QState::new(0.0, false, 50.0);
        for _ in 0..250 {
            agent.update(&s, Action::Buy, 1.0, &s);
        }
        let stats = agent.stats(&[trade(1.0), trade(-1.0), trade(1.0), trade(0.0)]);
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.total_profit, 1.0);
        assert_eq!(stats.q_table_size, 1);
        assert_eq!(stats.learning_progress, 25.0);
    }

    #[test]
    fn test_learning_progress_caps_at_100() {
        let (_, mut agent) = agent();
        let s = QState::new(0.0, false, 50.0);
        for _ in 0..1500 {
            agent.update(&s, Action::Hold, 0.0, &s);
        }
        assert_eq!(agent.stats(&[]).learning_progress, 100.0);
    }
}
