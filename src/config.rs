//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::advisor::AdvisorConfig;
pub use crate::rl::feedback::TradeFeedbackConfig;
pub use crate::rl::predictor::RlPredictorConfig;
pub use crate::rl::q_learning::QLearningConfig;
pub use crate::signals::confirmation::SignalConfirmationConfig;
pub use crate::signals::dump_risk::DumpRiskConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub signal_confirmation: SignalConfirmationConfig,
    pub dump_risk: DumpRiskConfig,
    pub q_learning: QLearningConfig,
    pub predictor: RlPredictorConfig,
    pub trade_feedback: TradeFeedbackConfig,
    pub advisor: AdvisorConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// One JSON file per key under `data_dir`
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    /// Load configuration from file and environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (e.g. COCKPIT__DUMP_RISK__THRESHOLD)
            .add_source(
                config::Environment::with_prefix("COCKPIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let confirmation = &self.signal_confirmation;
        if !(1..=5).contains(&confirmation.min_confirmations) {
            anyhow::bail!(
                "signal_confirmation.min_confirmations must be between 1 and 5, got {}",
                confirmation.min_confirmations
            );
        }
        if confirmation.volatility_min >= confirmation.volatility_max {
            anyhow::bail!(
                "signal_confirmation volatility band is inverted ({} >= {})",
                confirmation.volatility_min,
                confirmation.volatility_max
            );
        }

        if !(0.1..=1.0).contains(&self.dump_risk.threshold) {
            anyhow::bail!(
                "dump_risk.threshold must be between 0.1 and 1.0, got {}",
                self.dump_risk.threshold
            );
        }

        let q = &self.q_learning;
        if !(q.learning_rate > 0.0 && q.learning_rate <= 1.0) {
            anyhow::bail!("q_learning.learning_rate must be in (0, 1], got {}", q.learning_rate);
        }
        if !(0.0..1.0).contains(&q.discount_factor) {
            anyhow::bail!(
                "q_learning.discount_factor must be in [0, 1), got {}",
                q.discount_factor
            );
        }
        if !(0.0..=1.0).contains(&q.epsilon) {
            anyhow::bail!("q_learning.epsilon must be in [0, 1], got {}", q.epsilon);
        }
        if q.save_interval == 0 {
            anyhow::bail!("q_learning.save_interval must be positive");
        }

        if self.trade_feedback.history_limit == 0 {
            anyhow::bail!("trade_feedback.history_limit must be positive");
        }

        if self.storage.backend == StorageBackend::File && self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir cannot be empty for the file backend");
        }

        Ok(())
    }

    /// Human-readable summary
    pub fn display(&self) -> String {
        let seed = match self.q_learning.seed {
            Some(seed) => seed.to_string(),
            None => "(entropy)".to_string(),
        };

        format!(
            r#"Configuration:
  Storage:
    backend: {:?}
    data_dir: {}
  Signal Confirmation:
    min_confirmations: {}
    min_total_weight: {}
    volatility_band: ({}, {})
  Dump Risk:
    threshold: {}
    min_history: {}
    rsi_period: {}
  Q-Learning:
    learning_rate: {}
    discount_factor: {}
    epsilon: {}
    save_interval: {}
    storage_key: {}
    seed: {}
  Predictor:
    latency: {}ms
    noise_spans: {:?}
  Trade Feedback:
    rewards: +{} / {}
    history_limit: {}
"#,
            self.storage.backend,
            self.storage.data_dir,
            self.signal_confirmation.min_confirmations,
            self.signal_confirmation.min_total_weight,
            self.signal_confirmation.volatility_min,
            self.signal_confirmation.volatility_max,
            self.dump_risk.threshold,
            self.dump_risk.min_history,
            self.dump_risk.rsi_period,
            self.q_learning.learning_rate,
            self.q_learning.discount_factor,
            self.q_learning.epsilon,
            self.q_learning.save_interval,
            self.q_learning.storage_key,
            seed,
            self.predictor.latency_ms,
            self.predictor.noise_spans,
            self.trade_feedback.success_reward,
            self.trade_feedback.failure_reward,
            self.trade_feedback.history_limit,
        )
    }
}
