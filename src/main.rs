//! Xolana Wallet
//!
//! Command-line wallet for the X1 Xolana test network: balances, transfers,
//! transaction lookup, validator and gossip listings, and RPC diagnostics.
//!
//! Results go to stdout; logs go to stderr.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xolana_wallet::config::{Config, ENV_KEYPAIR, ENV_RPC_URL};
use xolana_wallet::structured_logging::CommandContext;
use xolana_wallet::wallet::WalletManager;
use xolana_wallet::{Command, HttpRpcTransport, RpcTransport, WalletApp};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "xolana.toml")]
    config: String,

    /// RPC endpoint (overrides config and environment)
    #[arg(long, env = ENV_RPC_URL)]
    rpc_url: Option<String>,

    /// Keypair file (overrides config and environment)
    #[arg(short, long, env = ENV_KEYPAIR)]
    keypair: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print command output as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Show the balance and recent transactions of an address (default: your wallet)
    Balance { address: Option<String> },

    /// Send native units to a recipient
    Send {
        recipient: String,
        /// Amount in display units, e.g. 1.5
        amount: String,
        /// Return right after submission instead of waiting for the outcome
        #[arg(long)]
        no_wait: bool,
    },

    /// Look up and decode a transaction
    Tx { signature: String },

    /// List current and delinquent validators
    Validators,

    /// List gossip nodes
    Gossip,

    /// Measure RPC round-trip latency
    Ping {
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Show wallet and node details
    Info,
}

impl From<CliCommand> for Command {
    fn from(cmd: CliCommand) -> Self {
        match cmd {
            CliCommand::Balance { address } => Command::Balance { address },
            CliCommand::Send {
                recipient,
                amount,
                no_wait,
            } => Command::Send {
                recipient,
                amount,
                wait: !no_wait,
            },
            CliCommand::Tx { signature } => Command::Tx { signature },
            CliCommand::Validators => Command::Validators,
            CliCommand::Gossip => Command::Gossip,
            CliCommand::Ping { count } => Command::Ping { count },
            CliCommand::Info => Command::Info,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` has to be loaded before clap reads env fallbacks
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.log_json)?;

    // Load configuration; flags (and their env fallbacks) win over the file
    let mut config = load_config(&args.config)?;
    config.apply_overrides(args.rpc_url.clone(), args.keypair.clone());
    config.validate().context("Invalid configuration")?;

    info!(rpc_url = %config.rpc.url, "Using RPC endpoint");
    let transport: Arc<dyn RpcTransport> = Arc::new(
        HttpRpcTransport::new(
            config.rpc.url.clone(),
            Duration::from_secs(config.rpc.timeout_secs),
        )
        .context("Failed to initialize RPC transport")?,
    );

    // Queries on explicit addresses work without a wallet
    let keypair_path = config.keypair_path();
    let wallet = match WalletManager::from_file(&keypair_path) {
        Ok(wallet) => {
            info!(address = %wallet.pubkey(), "Wallet loaded");
            Some(wallet)
        }
        Err(e) => {
            warn!(path = %keypair_path.display(), error = %e, "Failed to load keypair");
            None
        }
    };

    let app = WalletApp::new(config, transport, wallet);
    let command = Command::from(args.command);
    let ctx = CommandContext::new(command.name());

    let output = tokio::select! {
        result = app.execute(command, &ctx) => result.map_err(|e| {
            ctx.logger.error(&format!("{} ({})", e, e.category()));
            anyhow::Error::new(e)
        })?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, exiting");
            return Ok(());
        }
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize output")?
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "xolana_wallet=debug,info"
    } else {
        "xolana_wallet=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    }
    .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}
