//! deposittrack CLI — run the deposit tracker and inspect the ledger.
//!
//! Usage:
//! ```bash
//! # Run the live tracker (reads ETH_WS_URL, ETH_HTTP_URL, ... from env)
//! deposittrack run
//!
//! # Show the last 10 recorded deposits
//! deposittrack ledger --path data/deposits.jsonl --tail 10
//! ```

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deposittrack_codec::DEPOSIT_EVENT_TOPIC;
use deposittrack_core::config::TrackerConfig;
use deposittrack_core::types::LogFilter;
use deposittrack_notify::{startup_message, Notifier, TelegramNotifier};
use deposittrack_rpc::client::{HttpClientConfig, HttpRpcClient};
use deposittrack_rpc::retry::RetryConfig;
use deposittrack_store::Ledger;
use deposittrack_stream::{DepositTracker, Enricher, EthWsListener, Pipeline};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "run" => cmd_run().await,
        "ledger" => cmd_ledger(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("deposittrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("deposittrack {}", env!("CARGO_PKG_VERSION"));
    println!("Track beacon-chain deposit events to a durable ledger\n");
    println!("USAGE:");
    println!("    deposittrack <COMMAND>\n");
    println!("COMMANDS:");
    println!("    run      Run the live tracker (configured via environment)");
    println!("    ledger   Show recorded deposits");
    println!("    version  Print version");
    println!("    help     Print this help\n");
    println!("ENVIRONMENT (run):");
    println!("    ETH_WS_URL           WebSocket endpoint         [required]");
    println!("    ETH_HTTP_URL         HTTP JSON-RPC endpoint     [required]");
    println!("    DEPOSIT_CONTRACT     Contract address to watch");
    println!("    LEDGER_PATH          Ledger file path");
    println!("    TELEGRAM_BOT_TOKEN   Telegram bot token");
    println!("    TELEGRAM_CHAT_ID     Telegram chat id\n");
    println!("LEDGER FLAGS:");
    println!("    --path <FILE>   Ledger file  [default: data/deposits.jsonl]");
    println!("    --tail <N>      Show only the last N records");
}

async fn cmd_run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TrackerConfig::from_env().map_err(|e| anyhow!(e))?;
    info!(
        contract = %config.contract_address,
        ledger = %config.ledger_path,
        "starting deposit tracker"
    );

    let rpc = HttpRpcClient::new(
        &config.provider.http_url,
        HttpClientConfig {
            retry: RetryConfig {
                max_retries: config.provider.max_retries,
                initial_backoff: Duration::from_millis(config.provider.backoff_ms),
                ..RetryConfig::default()
            },
            ..HttpClientConfig::default()
        },
    )
    .context("building RPC client")?;

    let ledger = Ledger::open(&config.ledger_path)
        .with_context(|| format!("opening ledger at {}", config.ledger_path))?;
    let notifier =
        Arc::new(TelegramNotifier::new(config.telegram.clone()).context("building notifier")?);

    // Announce liveness before the first subscription attempt.
    if let Err(e) = notifier.send(&startup_message()).await {
        warn!(error = %e, "startup notification failed");
    }

    let pipeline = Arc::new(Pipeline::new(
        Enricher::new(Arc::new(rpc)),
        Arc::new(ledger),
        notifier,
    ));
    let tracker = DepositTracker::new(
        Arc::new(EthWsListener::new(&config.provider.ws_url)),
        LogFilter::new(&config.contract_address, DEPOSIT_EVENT_TOPIC),
        pipeline,
        Duration::from_millis(config.provider.backoff_ms),
        Duration::from_millis(config.drain_timeout_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    tracker.run(shutdown_rx).await;

    let metrics = tracker.metrics();
    info!(
        recorded = metrics.deposits_recorded,
        store_failures = metrics.store_failures,
        reconnections = metrics.reconnections,
        "tracker stopped"
    );
    Ok(())
}

fn cmd_ledger(args: &[String]) -> Result<()> {
    let path = parse_flag(args, "--path").unwrap_or_else(|| "data/deposits.jsonl".into());
    let tail: Option<usize> = parse_flag(args, "--tail").and_then(|v| v.parse().ok());

    let records = Ledger::read_all(&path).with_context(|| format!("reading {path}"))?;
    let total = records.len();
    let skip = tail.map_or(0, |n| total.saturating_sub(n));

    for record in &records[skip..] {
        println!(
            "block {:>9}  ts {}  fee {} wei  {}  {}",
            record.block_number,
            record.block_timestamp,
            record.fee_wei,
            record.transaction_hash,
            record.pubkey,
        );
    }
    println!("{total} deposit(s) on record");
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
