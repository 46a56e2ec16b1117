//! Configuration module for the wallet
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `rpc.url`
pub const ENV_RPC_URL: &str = "XOLANA_RPC_URL";
/// Environment variable overriding `wallet.keypair_path`
pub const ENV_KEYPAIR: &str = "XOLANA_KEYPAIR";

pub const DEFAULT_RPC_URL: &str = "http://xolana.xen.network:8899";
/// Upper bound on probes per `ping` run
pub const MAX_PING_COUNT: u32 = 1_000;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Transfer submission options
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Post-submission polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Read-only query knobs
    #[serde(default)]
    pub queries: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment used for blockhash and transaction lookups
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// How many recent signatures `balance` lists
    #[serde(default = "default_recent_signatures_limit")]
    pub recent_signatures_limit: usize,

    /// Default number of `ping` probes
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Pause between `ping` probes
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

// Default value functions
fn default_rpc_url() -> String { DEFAULT_RPC_URL.to_string() }
fn default_rpc_timeout() -> u64 { 10 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_settle_delay_ms() -> u64 { 15_000 }
fn default_max_attempts() -> u32 { 5 }
fn default_base_delay_ms() -> u64 { 1_000 }
fn default_max_delay_ms() -> u64 { 8_000 }
fn default_multiplier() -> f64 { 2.0 }
fn default_jitter_factor() -> f64 { 0.1 }
fn default_recent_signatures_limit() -> usize { 5 }
fn default_ping_count() -> u32 { 5 }
fn default_ping_interval_ms() -> u64 { 1_000 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            skip_preflight: false,
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recent_signatures_limit: default_recent_signatures_limit(),
            ping_count: default_ping_count(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            transfer: TransferConfig::default(),
            confirmation: ConfirmationConfig::default(),
            queries: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// A `.env` file in the working directory is honoured when present.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `XOLANA_RPC_URL` / `XOLANA_KEYPAIR` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_RPC_URL).ok(),
            std::env::var(ENV_KEYPAIR).ok(),
        );
    }

    /// Replace the endpoint and/or keypair path; empty values are ignored
    pub fn apply_overrides(&mut self, rpc_url: Option<String>, keypair_path: Option<String>) {
        if let Some(url) = rpc_url.filter(|u| !u.trim().is_empty()) {
            self.rpc.url = url;
        }
        if let Some(path) = keypair_path.filter(|p| !p.trim().is_empty()) {
            self.wallet.keypair_path = path;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            bail!("rpc.url must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            bail!("rpc.timeout_secs must be greater than zero");
        }
        if self.confirmation.max_attempts == 0 {
            bail!("confirmation.max_attempts must be greater than zero");
        }
        if self.confirmation.multiplier < 1.0 {
            bail!("confirmation.multiplier must be at least 1.0");
        }
        if !(0.0..=1.0).contains(&self.confirmation.jitter_factor) {
            bail!("confirmation.jitter_factor must be within 0.0..=1.0");
        }
        if !(1..=MAX_PING_COUNT).contains(&self.queries.ping_count) {
            bail!("queries.ping_count must be within 1..={}", MAX_PING_COUNT);
        }
        Ok(())
    }

    /// Keypair path with a leading `~` expanded against `$HOME`
    pub fn keypair_path(&self) -> PathBuf {
        expand_tilde(&self.wallet.keypair_path)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix("~"), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
