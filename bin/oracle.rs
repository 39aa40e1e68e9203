//! # Oracle Service
//!
//! Runs the result-consensus monitor against the configured providers and the
//! betting pool contract.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin oracle -- --config Config.toml
//! cargo run --bin oracle -- --once
//! ```
//!
//! Press Ctrl+C to stop gracefully. The cycle in progress finishes first.

use anyhow::{Context, Result};
use clap::Parser;
use matchday_oracle::{
    consensus::ResultValidator,
    ledger::ProcessedMatchesLedger,
    metrics,
    monitor::{MonitorConfig, OracleMonitor},
    providers,
    registrar::GameRegistrar,
    settings::Settings,
    settlement::{ChainSubmitter, GameRegistry, ResultSubmitter},
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "oracle")]
#[command(about = "Multi-provider match result oracle")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "Config.toml")]
    config: String,

    /// Run a single cycle and exit
    #[arg(long, default_value = "false")]
    once: bool,
}

fn init_logging(settings: &Settings) {
    #[cfg(feature = "observability")]
    {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(settings.log.level.clone()));
        if tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
        {
            return;
        }
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log.level.clone()),
    )
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();

    // 1. Load and validate settings
    let settings = Settings::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config))?;
    init_logging(&settings);
    settings.validate().context("invalid configuration")?;
    log::info!("✅ Settings loaded from {}", args.config);

    if let Some(port) = settings.metrics.prometheus_port {
        metrics::install_prometheus_exporter(port)?;
    }

    // 2. Providers
    let providers = providers::build_providers(&settings)?;

    // 3. Settlement client
    let chain = Arc::new(ChainSubmitter::connect(&settings.settlement).await?);
    log::info!(
        "✅ Settlement contract {:?}",
        chain.contract().address()
    );

    // 4. Ledger
    let ledger = Arc::new(ProcessedMatchesLedger::from_settings(&settings.ledger).await?);
    log::info!(
        "✅ Ledger backend {:?} ({} processed)",
        settings.ledger.backend,
        ledger.len()
    );

    // 5. Monitor
    let submitter: Arc<dyn ResultSubmitter> = chain.clone();
    let mut monitor = OracleMonitor::new(
        providers,
        ResultValidator::new(settings.oracle.confirmation_threshold),
        submitter,
        ledger,
        MonitorConfig::from_settings(&settings.oracle),
    );
    if settings.registration.enabled {
        let registry: Arc<dyn GameRegistry> = chain;
        monitor = monitor.with_registrar(GameRegistrar::new(registry));
        log::info!("✅ Game registration enabled");
    }

    if args.once {
        let report = monitor.run_cycle().await;
        log::info!("✅ Single cycle finished: {}", report);
        return Ok(());
    }

    // 6. Run until Ctrl+C
    let monitor = Arc::new(monitor);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.start(shutdown_rx).await })
    };

    signal::ctrl_c().await?;
    log::info!("🛑 Shutdown signal received, finishing current cycle...");
    shutdown_tx.send(true).ok();
    worker.await?;

    log::info!("👋 Oracle stopped ({} matches in ledger)", monitor.ledger().len());
    Ok(())
}
