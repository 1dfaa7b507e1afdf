//! Trading Cockpit Scoring Library
//!
//! Signal confirmation, dump-risk detection, bear-market regime detection,
//! a tabular Q-learning agent and a heuristic RL predictor. Every scorer is
//! an explicitly constructed value; persistence goes through an injected
//! [`storage::KeyValueStore`].

pub mod advisor;
pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod rl;
pub mod signals;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
