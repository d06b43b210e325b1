//! Launchpad CLI
//!
//! Read-only view of the sale pools on one ledger. Writes need a wallet and
//! go through the library API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use launchpad::config::{validate_config, ConfigLoader, ENV_PREFIX};
use launchpad::metrics::{init_tracing_with_metrics, MetricsCollector};
use launchpad::types::LedgerKind;
use launchpad::Launchpad;

/// Launchpad pool explorer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config profile; `LAUNCHPAD_*` variables override its values
    #[arg(long, global = true, default_value = "config/testnet.toml")]
    config: PathBuf,

    /// Ledger to read from
    #[arg(long, global = true, value_enum, default_value = "evm")]
    ledger: Ledger,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Ledger {
    Evm,
    Solana,
}

impl From<Ledger> for LedgerKind {
    fn from(ledger: Ledger) -> Self {
        match ledger {
            Ledger::Evm => LedgerKind::Evm,
            Ledger::Solana => LedgerKind::Solana,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every pool
    Pools,
    /// Show one pool
    Pool { id: u64 },
    /// Print collected metrics after a refresh
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::from_file_with_env(&args.config, ENV_PREFIX)
        .with_context(|| format!("loading {}", args.config.display()))?;
    validate_config(&config)?;

    let collector = Arc::new(MetricsCollector::new());
    init_tracing_with_metrics(&config.logging.level, config.logging.json, collector.clone())?;

    info!(
        environment = ?config.environment,
        ledger = ?args.ledger,
        "Starting launchpad"
    );

    let launchpad =
        Launchpad::from_config(&config, args.ledger.into(), None)?.with_metrics(collector.clone());
    let pools = launchpad.refresh().await?;

    match args.command {
        Command::Pools => {
            println!("{}", serde_json::to_string_pretty(pools.as_slice())?);
        }
        Command::Pool { id } => {
            let pool = launchpad
                .pool(id)
                .await
                .with_context(|| format!("pool {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&pool)?);
        }
        Command::Metrics => {
            print!("{}", collector.export_metrics()?);
        }
    }

    Ok(())
}
