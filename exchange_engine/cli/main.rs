//! `exchange`: publishes a sample dataset on a local simulated network.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use exchange_engine::crypto::{ShamirScheme, ThresholdScheme};
use exchange_engine::ledger::simulated::SimulatedNetwork;
use exchange_engine::logging::init_logging;
use exchange_engine::storage::{BlobStore, FsBlobStore, MemoryBlobStore};
use exchange_engine::types::PriceInfo;
use exchange_engine::{DataExchange, ExchangeConfig, Wallet};

/// Per-node compute price on the simulated task queue.
const NODE_PRICE: &str = "1000";

#[derive(Parser)]
#[command(name = "exchange", version, about = "Threshold data exchange: publish a sample dataset")]
struct Cli {
    /// Path to the publisher's JWK wallet file
    wallet: PathBuf,

    /// Generate the wallet file if it does not exist yet
    #[arg(long)]
    new_wallet: bool,

    /// Exchange config (TOML); falls back to $EXCHANGE_CONFIG, then ./exchange.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write rolling log files here as well as to stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// JSON log files instead of logfmt
    #[arg(long)]
    json_logs: bool,

    /// Compute nodes to register on the simulated network
    #[arg(long, default_value_t = 3)]
    nodes: usize,

    /// Keep ciphertexts in this directory instead of memory
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_deref(), cli.json_logs);
    run(&cli, &mut std::io::stdout()).await
}

/// Publishes the sample dataset; `out` receives only the `DATAID=` line.
async fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    info!(wallet = %cli.wallet.display(), "loading wallet");
    let wallet = load_wallet(cli)?;

    let config = ExchangeConfig::load(cli.config.as_deref()).context("Failed to load exchange config")?;

    let scheme: Arc<dyn ThresholdScheme> = Arc::new(ShamirScheme::new());
    let storage: Arc<dyn BlobStore> = match &cli.storage_dir {
        Some(dir) => Arc::new(
            FsBlobStore::open(dir).with_context(|| format!("Failed to open storage dir {}", dir.display()))?,
        ),
        None => Arc::new(MemoryBlobStore::new()),
    };

    let network = SimulatedNetwork::new(NODE_PRICE);
    network
        .add_nodes(cli.nodes, scheme.clone())
        .await
        .context("Failed to register compute nodes")?;
    info!(nodes = cli.nodes, "simulated network ready");

    let exchange = DataExchange::new(config, network.collaborators(scheme, storage))?;

    let data: Vec<u8> = (1..=8).collect();
    let data_tag = serde_json::json!({ "testtagkey": "testtagvalue" });
    let price = PriceInfo::new("200000000", "wAR");

    let data_id = exchange
        .upload_data(&data, &data_tag, &price, &wallet)
        .await
        .context("Failed to upload data")?;
    writeln!(out, "DATAID={data_id}")?;
    Ok(())
}

fn load_wallet(cli: &Cli) -> Result<Wallet> {
    if cli.new_wallet && !cli.wallet.exists() {
        let wallet = Wallet::generate();
        wallet
            .save(&cli.wallet)
            .with_context(|| format!("Failed to write wallet {}", cli.wallet.display()))?;
        info!(address = %wallet.address(), "generated wallet");
        return Ok(wallet);
    }
    Wallet::load(&cli.wallet).with_context(|| format!("Failed to read wallet {}", cli.wallet.display()))
}
