//! Reinforcement-learning components
//!
//! - `state` - discretized market state and action space
//! - `q_learning` - tabular Q-learning agent with persisted table
//! - `feedback` - trade outcomes fed back into the agent
//! - `features` - raw snapshot to feature vector
//! - `predictor` - heuristic multi-horizon predictor

pub mod features;
pub mod feedback;
pub mod predictor;
pub mod q_learning;
pub mod state;

pub use features::{extract_market_features, MarketFeatures, MarketSnapshot};
pub use feedback::{
    TradeFeedback, TradeFeedbackConfig, TradeHistory, TradeOutcome, TradeRecord, TradeSide,
};
pub use predictor::{
    load_rl_agent, Outlook, RiskLevel, RlAgentHandle, RlPrediction, RlPredictor, RlPredictorConfig,
};
pub use q_learning::{QLearningAgent, QLearningConfig, QLearningStats};
pub use state::{Action, ActionValues, QState, RsiBucket, TrendBucket, VolumeBucket};
