//! Check Game CLI
//!
//! Reads one game from the betting pool contract and lists its recent
//! `GameCreated` / `GameResultSet` events.
//!
//! Usage:
//!   cargo run --bin check_game -- --game 42
//!   cargo run --bin check_game -- --game 42 --blocks 50000 --rpc http://127.0.0.1:8545

use anyhow::{Context, Result};
use clap::Parser;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, H256, U256};
use matchday_oracle::contracts::{game_status_name, result_name, BettingPool};
use matchday_oracle::settings::Settings;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "check_game")]
#[command(about = "Inspect a game on the betting pool contract")]
struct Args {
    /// Canonical match id
    #[arg(long)]
    game: u64,

    /// How many recent blocks to scan for events
    #[arg(long, default_value_t = 10_000)]
    blocks: u64,

    /// RPC URL (defaults to settlement.rpc_url)
    #[arg(long)]
    rpc: Option<String>,

    /// Contract address (defaults to settlement.contract_address)
    #[arg(long)]
    contract: Option<String>,

    /// Path to the TOML config file
    #[arg(long, default_value = "Config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let settings = Settings::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config))?;

    let rpc_url = args.rpc.unwrap_or(settings.settlement.rpc_url.clone());
    let address = match args.contract {
        Some(raw) => Address::from_str(raw.trim()).context("invalid --contract address")?,
        None => settings.settlement.contract_address()?,
    };

    let provider = Arc::new(Provider::<Http>::try_from(rpc_url.as_str())?);
    let pool = BettingPool::new(address, provider.clone());
    let game_id = U256::from(args.game);
    let game_topic = H256::from_low_u64_be(args.game);

    println!("=== Game {} ===", args.game);
    println!("Contract: {:?}", address);
    println!("RPC: {}", rpc_url);
    println!();

    let (id, home, away, start_time, status, result, total_bets) = pool
        .games(game_id)
        .call()
        .await
        .context("games() call failed")?;

    if id.is_zero() {
        println!("Game is not registered on this contract.");
    } else {
        println!("{} vs {}", home, away);
        println!("Start time: {} (unix seconds)", start_time);
        println!("Status: {} ({})", game_status_name(status), status);
        println!("Result: {} ({})", result_name(result), result);
        println!("Total bets: {}", total_bets);
    }
    println!();

    let latest = provider.get_block_number().await?.as_u64();
    let from_block = latest.saturating_sub(args.blocks);
    println!("Scanning events in blocks {}..={}", from_block, latest);

    let created = pool
        .game_created_filter()
        .topic1(game_topic)
        .from_block(from_block)
        .to_block(latest)
        .query_with_meta()
        .await
        .context("GameCreated query failed")?;
    for (event, meta) in &created {
        println!(
            "  GameCreated    block {} tx {:?}: {} vs {} at {}",
            meta.block_number, meta.transaction_hash, event.home_team, event.away_team, event.start_time
        );
    }

    let results = pool
        .game_result_set_filter()
        .topic1(game_topic)
        .from_block(from_block)
        .to_block(latest)
        .query_with_meta()
        .await
        .context("GameResultSet query failed")?;
    for (event, meta) in &results {
        println!(
            "  GameResultSet  block {} tx {:?}: {}",
            meta.block_number,
            meta.transaction_hash,
            result_name(event.result)
        );
    }

    if created.is_empty() && results.is_empty() {
        println!("  (no events in range)");
    }
    Ok(())
}
