//! Live per-signature EVM event-log counter CLI.
//!
//! Scans a chain's full history through a hypersync endpoint, classifies
//! every matching log record by its signature identifier, and keeps
//! running counts with throughput until the stream catches up to the tip.
//!
//! # Usage
//!
//! ```bash
//! # Count ERC-20 activity on Ethereum mainnet
//! evtop scan --network eth --preset erc20
//!
//! # Custom signatures on Base
//! evtop scan --network base --signature "Transfer(address,address,uint256)"
//!
//! # Scan an explicit endpoint, skipping the registry
//! evtop scan --url https://eth.hypersync.xyz
//!
//! # Refresh the chain directory and list every known network
//! evtop networks --refresh
//!
//! # List built-in and config-defined signature presets
//! evtop presets
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use evtop::config::Config;
use evtop::report::{self, Reporter};
use evtop_core::{
    Client, NetworkRegistry, Session, presets, scanner::Scanner, signatures::SignatureIndex,
};

/// Preset used when no preset and no explicit signatures are given.
const DEFAULT_PRESET: &str = "erc20";

/// Live per-signature EVM event-log counter.
#[derive(Debug, Parser)]
#[command(name = "evtop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a network from block zero with live per-signature counts.
    Scan(ScanArgs),

    /// List known networks (current snapshot plus built-in defaults).
    Networks {
        /// Force a chain-directory refresh first.
        #[arg(long)]
        refresh: bool,

        /// Directory holding the network cache file.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },

    /// List built-in and config-defined signature presets.
    Presets {
        /// Path to the optional TOML config file.
        #[arg(long, default_value = "evtop.toml")]
        config: PathBuf,
    },
}

/// Arguments for the `scan` subcommand.
#[derive(Debug, clap::Args)]
struct ScanArgs {
    /// Network name to scan. Defaults to the config's `default_network`,
    /// then to `eth`.
    #[arg(long)]
    network: Option<String>,

    /// Signature-set preset to count (see `evtop presets`).
    #[arg(long, conflicts_with = "signature")]
    preset: Option<String>,

    /// Explicit event signature to count (repeatable), instead of a preset.
    #[arg(long = "signature")]
    signature: Vec<String>,

    /// Scan this endpoint URL directly, skipping registry resolution.
    #[arg(long)]
    url: Option<String>,

    /// Force a chain-directory refresh before resolving the network.
    #[arg(long)]
    refresh: bool,

    /// Directory holding the network cache file.
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Path to the optional TOML config file.
    #[arg(long, default_value = "evtop.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => cmd_scan(args).await,
        Command::Networks { refresh, cache_dir } => cmd_networks(refresh, &cache_dir).await,
        Command::Presets { config } => cmd_presets(&config),
    }
}

/// Execute the `scan` subcommand.
async fn cmd_scan(args: ScanArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let signatures = resolve_signatures(&args, &config)?;
    let index = SignatureIndex::new(&signatures);

    let endpoint = match &args.url {
        Some(url) => url.clone(),
        None => {
            let network = config.network(args.network.as_deref()).to_owned();
            let mut registry = NetworkRegistry::new(args.cache_dir.join("networks.json"));
            registry.refresh(args.refresh).await;
            registry.resolve(&network)?.to_owned()
        }
    };

    tracing::info!(
        endpoint = %endpoint,
        signatures = index.len(),
        "starting scan"
    );

    let client = Client::new(&endpoint)?;
    let mut scan =
        Scanner::with_sample_interval(client.session(&index), index, config.sample_interval());

    let interrupted = tokio::select! {
        result = drive(&mut scan) => {
            result.context("scan failed")?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        tracing::warn!(
            block = scan.cursor(),
            events = scan.snapshot().total,
            "interrupt received, abandoning scan"
        );
        bail!("scan interrupted");
    }

    report::print_summary(&scan.snapshot());
    Ok(())
}

/// Drive a scan to completion, reporting progress between batches.
async fn drive<S: Session>(scan: &mut Scanner<S>) -> Result<(), evtop_core::Error> {
    scan.start().await?;
    let mut reporter = Reporter::new();
    while scan.step().await? {
        reporter.tick(&scan.snapshot());
    }
    Ok(())
}

/// Execute the `networks` subcommand.
async fn cmd_networks(refresh: bool, cache_dir: &Path) -> Result<()> {
    let mut registry = NetworkRegistry::new(cache_dir.join("networks.json"));
    registry.refresh(refresh).await;
    report::print_networks(&registry);
    Ok(())
}

/// Execute the `presets` subcommand.
fn cmd_presets(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    report::print_presets(&config);
    Ok(())
}

/// The signature set for a scan: explicit `--signature` flags win, then a
/// config preset, then a built-in preset.
fn resolve_signatures(args: &ScanArgs, config: &Config) -> Result<Vec<String>> {
    if !args.signature.is_empty() {
        return Ok(args.signature.clone());
    }
    let name = args.preset.as_deref().unwrap_or(DEFAULT_PRESET);
    if let Some(signatures) = config.preset(name) {
        return Ok(signatures.to_vec());
    }
    if let Some(preset) = presets::by_name(name) {
        return Ok(preset.signatures.iter().map(|s| (*s).to_owned()).collect());
    }
    Err(evtop_core::Error::UnknownPreset {
        name: name.to_owned(),
        known: preset_names(config),
    }
    .into())
}

/// Built-in plus config-defined preset names, deduplicated and sorted.
fn preset_names(config: &Config) -> Vec<String> {
    let mut names: BTreeSet<String> = presets::names().iter().map(|n| (*n).to_owned()).collect();
    names.extend(config.preset_names());
    names.into_iter().collect()
}
