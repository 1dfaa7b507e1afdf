//! Cockpit scoring CLI
//!
//! Runs the signal scorers and the Q-learning agent against JSON inputs.
//! Results go to stdout as JSON; logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use cockpit_scoring::cli::commands;
use cockpit_scoring::config::Config;
use cockpit_scoring::rl::TradeSide;

/// Trading cockpit signal scoring
#[derive(Parser)]
#[command(name = "cockpit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate multi-signal confirmation
    Confirm {
        /// JSON input file, or - for stdin
        #[arg(short, long)]
        input: String,

        /// Override the minimum number of agreeing signals (1-5)
        #[arg(long)]
        min_confirmations: Option<usize>,
    },

    /// Score dump risk from price and volume history
    DumpRisk {
        /// JSON input file, or - for stdin
        #[arg(short, long)]
        input: String,

        /// Override the exit threshold (0.1-1.0)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Classify the market regime from macro indicators
    Bear {
        /// JSON input file, or - for stdin
        #[arg(short, long)]
        input: String,
    },

    /// Heuristic RL prediction for a market snapshot
    Predict {
        /// JSON snapshot file, or - for stdin
        #[arg(short, long)]
        input: String,

        /// Force the maximally bullish demo result
        #[arg(long)]
        god_mode: bool,

        /// Seed for the horizon noise
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sentiment, RL prediction and Q-agent action for a market snapshot
    Advise {
        /// JSON snapshot file, or - for stdin
        #[arg(short, long)]
        input: String,

        #[arg(long)]
        god_mode: bool,

        #[arg(long)]
        seed: Option<u64>,

        /// Current mid price used for the buy target
        #[arg(long)]
        mid_price: Option<f64>,
    },

    /// Q-learning agent commands
    Q {
        #[command(subcommand)]
        action: QAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum QAction {
    /// Epsilon-greedy action for a state
    Action {
        #[arg(short, long)]
        input: String,

        /// Always exploit
        #[arg(long)]
        god_mode: bool,
    },

    /// Greedy action for a state
    Best {
        #[arg(short, long)]
        input: String,
    },

    /// Action values for a state
    Values {
        #[arg(short, long)]
        input: String,
    },

    /// Apply one transition ({state, action, reward, nextState})
    Update {
        #[arg(short, long)]
        input: String,
    },

    /// Show learning statistics
    Stats,

    /// Feed an executed trade back into the agent
    RecordTrade {
        /// buy or sell
        #[arg(long)]
        side: TradeSide,

        /// The trade failed
        #[arg(long)]
        failed: bool,

        /// Market volume at execution
        #[arg(long, default_value = "0")]
        volume: f64,

        /// Trade amount
        #[arg(long, default_value = "0")]
        amount: f64,

        /// The trade filled without output
        #[arg(long)]
        no_output: bool,
    },

    /// Clear the Q-table and trade history
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("cockpit_scoring=info".parse().unwrap());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json_logs);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Confirm {
            input,
            min_confirmations,
        } => commands::confirm(&config, &input, min_confirmations).await,
        Commands::DumpRisk { input, threshold } => {
            commands::dump_risk(&config, &input, threshold).await
        }
        Commands::Bear { input } => commands::bear(&config, &input).await,
        Commands::Predict {
            input,
            god_mode,
            seed,
        } => commands::predict(&config, &input, god_mode, seed).await,
        Commands::Advise {
            input,
            god_mode,
            seed,
            mid_price,
        } => commands::advise(&config, &input, god_mode, seed, mid_price).await,
        Commands::Q { action } => match action {
            QAction::Action { input, god_mode } => {
                commands::q_action(&config, &input, god_mode).await
            }
            QAction::Best { input } => commands::q_best(&config, &input).await,
            QAction::Values { input } => commands::q_values(&config, &input).await,
            QAction::Update { input } => commands::q_update(&config, &input).await,
            QAction::Stats => commands::q_stats(&config).await,
            QAction::RecordTrade {
                side,
                failed,
                volume,
                amount,
                no_output,
            } => commands::q_record_trade(&config, side, failed, volume, amount, no_output).await,
            QAction::Reset { force } => commands::q_reset(&config, force).await,
        },
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
