//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::Confirm;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use crate::advisor::{AdvisorSentiment, SentimentAdvisor};
use crate::config::Config;
use crate::market::{BearMarketDetector, MacroIndicators};
use crate::rl::{
    extract_market_features, load_rl_agent, Action, MarketFeatures, MarketSnapshot,
    QLearningAgent, QState, RlPrediction, RlPredictor, TradeFeedback, TradeOutcome, TradeSide,
};
use crate::signals::{ConfirmationInput, DumpRiskDetector, DumpRiskState, SignalConfirmation};
use crate::storage::{open_store, KeyValueStore};

/// Body of `q update`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QUpdateInput {
    pub state: QState,
    pub action: Action,
    pub reward: f64,
    pub next_state: QState,
}

/// Output of `advise`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub features: MarketFeatures,
    pub sentiment: AdvisorSentiment,
    pub prediction: RlPrediction,
    pub q_action: Action,
}

/// Read a JSON document from a file, or from stdin when `input` is `-`
pub async fn read_input<T: DeserializeOwned>(input: &str) -> Result<T> {
    let raw = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(Path::new(input))
            .await
            .with_context(|| format!("Failed to read {}", input))?
    };

    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", input))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn open(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    open_store(&config.storage).context("Failed to open storage")
}

fn q_agent(config: &Config, store: Arc<dyn KeyValueStore>) -> QLearningAgent {
    QLearningAgent::new(config.q_learning.clone(), store)
}

fn flush_agent(agent: &QLearningAgent) {
    if let Err(e) = agent.flush() {
        warn!("Failed to save Q-table: {}", e);
    }
}

/// Evaluate signal confirmation
pub async fn confirm(config: &Config, input: &str, min_confirmations: Option<usize>) -> Result<()> {
    let state: ConfirmationInput = read_input(input).await?;
    let mut scorer = SignalConfirmation::new(config.signal_confirmation.clone());
    if let Some(n) = min_confirmations {
        scorer.set_min_confirmations(n);
    }

    let result = scorer.evaluate(&state);
    info!(
        confirmed = result.confirmed,
        count = result.count,
        weight = result.total_weight,
        "Signal confirmation evaluated"
    );
    print_json(&result)
}

/// Score dump risk
pub async fn dump_risk(config: &Config, input: &str, threshold: Option<f64>) -> Result<()> {
    let state: DumpRiskState = read_input(input).await?;
    let mut detector = DumpRiskDetector::new(config.dump_risk.clone());
    if let Some(t) = threshold {
        detector.set_threshold(t);
    }

    let result = detector.detect_dump_risk(&state);
    if result.should_exit {
        warn!(risk = result.risk_score, "Dump risk above exit threshold");
    }
    print_json(&result)
}

/// Classify the market regime and persist it
pub async fn bear(config: &Config, input: &str) -> Result<()> {
    let data: MacroIndicators = read_input(input).await?;
    let mut detector = BearMarketDetector::new(open(config)?);
    let state = detector.calculate_bear_confidence(&data);
    info!(confidence = state.confidence, status = %state.status, "Market regime");
    print_json(&state)
}

/// Heuristic RL prediction for a market snapshot
pub async fn predict(config: &Config, input: &str, god_mode: bool, seed: Option<u64>) -> Result<()> {
    let snapshot: MarketSnapshot = read_input(input).await?;
    let features = extract_market_features(&snapshot);

    let handle = load_rl_agent().await;
    if !handle.loaded {
        anyhow::bail!("RL agent failed to load");
    }

    let predictor = RlPredictor::new(config.predictor.clone());
    let prediction = predictor
        .predict(&features, god_mode, &mut rng_for(seed))
        .await;
    print_json(&prediction)
}

/// Sentiment, RL prediction and Q-agent action for a market snapshot
pub async fn advise(
    config: &Config,
    input: &str,
    god_mode: bool,
    seed: Option<u64>,
    mid_price: Option<f64>,
) -> Result<()> {
    let snapshot: MarketSnapshot = read_input(input).await?;
    let advice = build_advice(config, &snapshot, god_mode, seed, mid_price).await?;
    print_json(&advice)
}

async fn build_advice(
    config: &Config,
    snapshot: &MarketSnapshot,
    god_mode: bool,
    seed: Option<u64>,
    mid_price: Option<f64>,
) -> Result<Advice> {
    let features = extract_market_features(snapshot);
    let mut rng = rng_for(seed);

    let advisor = SentimentAdvisor::new(config.advisor.clone());
    let sentiment = advisor.assess(&features, god_mode, mid_price, &mut rng);

    let predictor = RlPredictor::new(config.predictor.clone());
    let prediction = predictor.predict(&features, god_mode, &mut rng).await;

    let mut agent = q_agent(config, open(config)?);
    let state = features.q_state(config.trade_feedback.volume_spike_threshold);
    let q_action = agent.action(&state, god_mode);

    Ok(Advice {
        features,
        sentiment,
        prediction,
        q_action,
    })
}

/// Epsilon-greedy action for a state
pub async fn q_action(config: &Config, input: &str, god_mode: bool) -> Result<()> {
    let state: QState = read_input(input).await?;
    let mut agent = q_agent(config, open(config)?);
    let action = agent.action(&state, god_mode);
    print_json(&serde_json::json!({ "state": state.key(), "action": action }))
}

/// Greedy action for a state
pub async fn q_best(config: &Config, input: &str) -> Result<()> {
    let state: QState = read_input(input).await?;
    let mut agent = q_agent(config, open(config)?);
    let action = agent.best_action(&state);
    print_json(&serde_json::json!({ "state": state.key(), "action": action }))
}

/// Action values for a state
pub async fn q_values(config: &Config, input: &str) -> Result<()> {
    let state: QState = read_input(input).await?;
    let agent = q_agent(config, open(config)?);
    print_json(&serde_json::json!({ "state": state.key(), "values": agent.q_values(&state) }))
}

/// Apply one Q-learning transition
pub async fn q_update(config: &Config, input: &str) -> Result<()> {
    let update: QUpdateInput = read_input(input).await?;
    let mut agent = q_agent(config, open(config)?);
    agent.update(&update.state, update.action, update.reward, &update.next_state);
    flush_agent(&agent);

    print_json(&serde_json::json!({
        "state": update.state.key(),
        "values": agent.q_values(&update.state),
        "totalUpdates": agent.total_updates(),
    }))
}

/// Learning statistics
pub async fn q_stats(config: &Config) -> Result<()> {
    let store = open(config)?;
    let agent = q_agent(config, store.clone());
    let feedback = TradeFeedback::new(config.trade_feedback.clone(), store);
    print_json(&agent.stats(&feedback.history().records()))
}

/// Feed an executed trade back into the agent
pub async fn q_record_trade(
    config: &Config,
    side: TradeSide,
    failed: bool,
    volume: f64,
    amount: f64,
    no_output: bool,
) -> Result<()> {
    let store = open(config)?;
    let mut agent = q_agent(config, store.clone());
    let mut feedback = TradeFeedback::new(config.trade_feedback.clone(), store);

    let outcome = TradeOutcome {
        side,
        success: !failed,
        total_volume: volume,
        amount,
        output_amount: if no_output { None } else { Some(amount) },
    };
    let record = feedback.record(&mut agent, &outcome);
    flush_agent(&agent);

    print_json(&record)
}

/// Clear the Q-table and the trade history
pub async fn q_reset(config: &Config, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Reset the Q-table and trade history? This cannot be undone.")
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Reset cancelled by user");
            return Ok(());
        }
    }

    let store = open(config)?;
    let mut agent = q_agent(config, store.clone());
    let mut feedback = TradeFeedback::new(config.trade_feedback.clone(), store);
    agent.reset();
    feedback.history_mut().clear();

    println!("Q-table and trade history cleared");
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.display());
    Ok(())
}
