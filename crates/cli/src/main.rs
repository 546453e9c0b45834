use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

mod paper;

use paper::{mark_store, FileFeed, PaperRouter, SimReference};
use strike_core::ConfigLoader;
use strike_engine::{Engine, Persistence};

#[derive(Parser)]
#[command(name = "strike")]
#[command(about = "Index-options decision engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine over a JSONL tick capture with paper execution
    Run {
        /// Tick capture file (one JSON tick per line)
        #[arg(short, long)]
        ticks: String,
        /// Config profile overlay (config/Strike.<profile>.toml)
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Print the effective configuration
    Config {
        /// Config profile overlay
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Show recent closed trades from the journal
    Journal {
        /// Number of trades to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { ticks, profile } => run(&ticks, profile.as_deref()).await,
        Commands::Config { profile } => {
            let config = load_config(profile.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Journal { limit } => {
            let config = load_config(None)?;
            let persistence = Persistence::new(&config.persistence);
            for record in persistence.recent_trades(limit) {
                println!(
                    "{} {} {} pnl={} exit={}",
                    record.exited_at.format("%Y-%m-%d %H:%M:%S"),
                    record.position_id,
                    record.strategy,
                    record.realized_pnl,
                    record.exit_reason,
                );
            }
            Ok(())
        }
    }
}

fn load_config(profile: Option<&str>) -> anyhow::Result<strike_core::AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile),
        None => ConfigLoader::load(),
    }
}

async fn run(ticks: &str, profile: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(profile)?;
    info!(
        underlying = %config.feed.underlying,
        capture = ticks,
        "starting paper run"
    );

    let marks = mark_store();
    let feed = FileFeed::open(ticks, Arc::clone(&marks))?;
    let router = Arc::new(PaperRouter::new(Arc::clone(&marks)));
    let reference = Arc::new(SimReference::new(config.execution.lot_size, marks));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let engine = Engine::new(config, Box::new(feed), router, reference, None, shutdown_rx);
    engine.run().await
}
