//! Alpha Screener - Token risk filtering and composite scoring pipeline
//!
//! Evaluates candidate tokens through the quick screen, risk cascade,
//! composite scorer and decision gate, and emits trade signals. The binary
//! runs against captured replay fixtures; live collaborators plug in
//! through the provider traits in the library crate.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use alpha_screener::config::Config;
use alpha_screener::pipeline::{EvaluationOutcome, Pipeline};
use alpha_screener::replay::{
    ReplayBook, ReplayKol, ReplayMarket, ReplayPositions, ReplayRugRegistry, ReplaySecurity,
    ReplaySocial,
};

/// Token risk filtering and composite scoring pipeline
#[derive(Parser)]
#[command(name = "alpha-screener")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate captured candidates from a replay fixture
    Replay {
        /// Path to the JSON replay fixture
        fixture: String,

        /// Evaluate a single token instead of the whole fixture
        #[arg(long)]
        token: Option<String>,

        /// Print emitted signals as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("alpha_screener=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Replay {
            fixture,
            token,
            json,
        } => replay(config, &fixture, token, json).await,
        Commands::Config => {
            println!("{:#?}", config);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn replay(config: Config, fixture: &str, token: Option<String>, json: bool) -> Result<()> {
    let book = Arc::new(ReplayBook::load(fixture)?);

    let pipeline = Pipeline::new(
        config,
        Arc::new(ReplayMarket(book.clone())),
        Arc::new(ReplaySocial(book.clone())),
        Arc::new(ReplaySecurity(book.clone())),
        Arc::new(ReplayKol(book.clone())),
        Arc::new(ReplayRugRegistry(book.clone())),
        Arc::new(ReplayPositions(book.clone())),
    )?;

    let addresses: Vec<String> = match token {
        Some(t) => vec![t],
        None => book.addresses().to_vec(),
    };

    let mut signals = 0usize;
    for address in &addresses {
        match pipeline.evaluate(address).await {
            Ok(EvaluationOutcome::Signal(signal)) => {
                signals += 1;
                info!(
                    token = %address,
                    kind = ?signal.kind,
                    composite = signal.score.composite_score,
                    size_pct = signal.position_size_pct,
                    "signal emitted"
                );
                if json {
                    println!("{}", serde_json::to_string_pretty(&*signal)?);
                }
            }
            Ok(EvaluationOutcome::Skipped { reason }) => {
                info!(token = %address, %reason, "skipped");
            }
            Ok(EvaluationOutcome::Rejected { filter }) => {
                info!(token = %address, flags = filter.flags.len(), "rejected by risk filter");
            }
            Ok(EvaluationOutcome::BelowThreshold { score, reason }) => {
                info!(
                    token = %address,
                    composite = score.composite_score,
                    %reason,
                    "below threshold"
                );
            }
            Err(e) => {
                warn!(token = %address, error = %e, "evaluation failed");
            }
        }
    }

    info!(
        candidates = addresses.len(),
        signals, "replay run complete"
    );
    Ok(())
}
