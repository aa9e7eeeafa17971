// In app/src/main.rs

use anyhow::{Context, Result};
use app_config::Settings;
use clap::{Parser, Subcommand};
use database::PersistenceSink;
use engine::{CandidateFeed, Engine, PriceRefresher, Trader, TraderSettings};
use execution::{Broker, LiveBroker, OrderMonitor, PaperBroker, SimulationSettings};
use risk::RiskManager;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A risk-managed token trading bot.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the trading bot in paper or live mode until Ctrl-C.
    Run {
        /// A JSON-lines file of rated token candidates, re-read every fetch interval.
        #[arg(short, long)]
        feed: Option<PathBuf>,
    },

    /// Prints the persisted positions.
    Positions,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let settings = app_config::load_settings().context("failed to load settings")?;

    let level = tracing::Level::from_str(&settings.app.log_level).unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("sqlx", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    let cli = Cli::parse();
    tracing::info!(environment = %settings.app.environment, "Starting trading bot.");

    match cli.command {
        Commands::Run { feed } => run_app(settings, feed).await?,
        Commands::Positions => show_positions(&settings).await?,
    }

    tracing::info!("Trading bot has finished successfully.");
    Ok(())
}

// --- "Run" Subcommand Logic ---

/// Wires every component together and trades until the feed ends or Ctrl-C.
/// On the way out, open orders are cancelled and the book is liquidated.
async fn run_app(settings: Settings, feed: Option<PathBuf>) -> Result<()> {
    // --- 1. Initialization ---
    let db = database::connect(&settings.database.url).await?;
    tracing::info!("Database connection established and migrations are up-to-date.");
    let sink: Arc<dyn PersistenceSink> = Arc::new(db.clone());

    // --- 2. Component Instantiation ---
    let broker: Arc<dyn Broker> = if settings.trading.paper_trading {
        Arc::new(PaperBroker::new(SimulationSettings {
            slippage_percent: settings.trading.paper_slippage,
        }))
    } else {
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
        let api_client = api_client::ApiClient::new(&settings.broker)?;
        Arc::new(LiveBroker::new(api_client))
    };

    let risk = Arc::new(RiskManager::new(&settings.risk, sink.clone())?);
    risk.restore_positions(db.load_positions().await?).await;

    let monitor = OrderMonitor::new(broker.clone(), sink.clone(), &settings.monitor);
    let trader = Arc::new(Trader::new(risk, broker, monitor, TraderSettings::from_settings(&settings)));

    let health = trader.health_check().await;
    if health.healthy {
        tracing::info!(?health, "Trader is healthy.");
    } else {
        tracing::warn!(?health, "Trader reports problems at startup.");
    }

    // --- 3. Launch Concurrent Tasks ---
    let refresher = PriceRefresher::new(trader.clone(), settings.trading.price_refresh_interval());
    let refresher_handle = tokio::spawn(async move { refresher.run().await });

    let engine = Engine::new(trader.clone(), sink, settings.trading.clone());
    let decision_loop = async {
        match feed {
            Some(path) => {
                let feed = CandidateFeed::new(path, settings.trading.fetch_interval());
                engine.run(feed.subscribe()).await;
            }
            None => {
                tracing::info!("No candidate feed given. Managing existing positions only.");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = decision_loop => {
            tracing::warn!("Decision loop terminated.");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
            }
            tracing::info!("Shutdown requested.");
        }
    }

    // --- 4. Shutdown ---
    refresher_handle.abort();
    trader.emergency_stop().await;

    let summary = trader.get_portfolio_summary().await;
    tracing::info!(summary = %serde_json::to_string(&summary)?, "Final portfolio summary.");
    Ok(())
}

// --- "Positions" Subcommand Logic ---

async fn show_positions(settings: &Settings) -> Result<()> {
    let db = database::connect(&settings.database.url).await?;
    let positions = db.load_positions().await?;

    if positions.is_empty() {
        println!("No open positions.");
    } else {
        println!(
            "{:<12} {:>16} {:>14} {:>14} {:>14} {:>12} {:>12}",
            "SYMBOL", "QUANTITY", "ENTRY", "MARK", "UNREALIZED", "STOP", "TARGET"
        );
        for p in &positions {
            println!(
                "{:<12} {:>16} {:>14} {:>14} {:>14} {:>12} {:>12}",
                p.symbol,
                p.quantity.round_dp(6),
                p.avg_entry_price.round_dp(8),
                p.current_price.round_dp(8),
                p.unrealized_pnl.round_dp(2),
                p.stop_loss_price.map(|v| v.round_dp(8).to_string()).unwrap_or_else(|| "-".into()),
                p.take_profit_price.map(|v| v.round_dp(8).to_string()).unwrap_or_else(|| "-".into()),
            );
        }
    }
    println!("{} trade(s) recorded.", db.trade_count().await?);
    Ok(())
}
