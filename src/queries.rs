//! Read-only cluster queries
//!
//! Balance with recent history, vote accounts, gossip peers, a node summary
//! and an RPC round-trip probe. All of them go through [`RpcTransport`].

use serde::Serialize;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::rpc_manager::{RpcTransport, TransportError};
use crate::types::{lamports_to_sol, CURRENCY};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureEntry {
    pub signature: String,
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    pub address: String,
    pub lamports: u64,
    pub units: f64,
    pub recent: Vec<SignatureEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorRow {
    pub identity: String,
    pub vote_account: String,
    pub commission: Option<u64>,
    pub activated_stake: u64,
    pub last_vote: Option<u64>,
    /// Credits of the most recent `epochCredits` entry
    pub epoch_credits: Option<u64>,
    pub delinquent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorReport {
    pub current: Vec<ValidatorRow>,
    pub delinquent: Vec<ValidatorRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GossipNode {
    pub pubkey: String,
    pub gossip: String,
    pub tpu: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GossipReport {
    pub nodes: Vec<GossipNode>,
}

/// Each field is fetched independently; a failure only blanks that field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInfo {
    pub wallet_address: Option<String>,
    pub wallet_balance: Option<Result<u64, String>>,
    pub rpc_url: String,
    pub version: Result<String, String>,
    pub health: Result<String, String>,
    pub slot: Result<u64, String>,
    pub block_time: Result<i64, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingProbe {
    pub seq: u32,
    pub latency_ms: Option<f64>,
    pub error: Option<String>,
}

impl PingProbe {
    pub fn success(&self) -> bool {
        self.latency_ms.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingReport {
    pub probes: Vec<PingProbe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PingSummary {
    pub sent: usize,
    pub succeeded: usize,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

impl PingReport {
    /// `None` when no probe succeeded
    pub fn summary(&self) -> Option<PingSummary> {
        let latencies: Vec<f64> = self.probes.iter().filter_map(|p| p.latency_ms).collect();
        if latencies.is_empty() {
            return None;
        }
        let min_ms = latencies.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_ms = latencies.iter().sum::<f64>() / latencies.len() as f64;
        Some(PingSummary {
            sent: self.probes.len(),
            succeeded: latencies.len(),
            min_ms,
            avg_ms,
            max_ms,
        })
    }
}

#[derive(Clone)]
pub struct QueryService {
    transport: Arc<dyn RpcTransport>,
    commitment: String,
}

impl QueryService {
    pub fn new(transport: Arc<dyn RpcTransport>, commitment: impl Into<String>) -> Self {
        Self {
            transport,
            commitment: commitment.into(),
        }
    }

    fn commitment_param(&self) -> Value {
        json!({ "commitment": self.commitment })
    }

    /// Lamport balance (`getBalance.value`)
    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64, TransportError> {
        let result = self
            .transport
            .call(
                "getBalance",
                vec![json!(address.to_string()), self.commitment_param()],
            )
            .await?;
        result
            .pointer("/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                TransportError::MalformedResponse(format!("getBalance result without value: {}", result))
            })
    }

    /// Most recent signatures touching `address`
    ///
    /// Uses the legacy `getConfirmedSignaturesForAddress2` first and falls back to
    /// `getSignaturesForAddress` on nodes that no longer serve it. A `null`
    /// result is treated the same as an empty list.
    pub async fn recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureEntry>, TransportError> {
        let params = vec![json!(address.to_string()), json!({ "limit": limit })];
        let result = match self
            .transport
            .call("getConfirmedSignaturesForAddress2", params.clone())
            .await
        {
            Err(e) if e.is_method_not_found() => {
                debug!("getConfirmedSignaturesForAddress2 unavailable, using getSignaturesForAddress");
                self.transport.call("getSignaturesForAddress", params).await?
            }
            other => other?,
        };

        Ok(result
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(SignatureEntry {
                            signature: entry.get("signature")?.as_str()?.to_string(),
                            slot: entry.get("slot").and_then(Value::as_u64).unwrap_or(0),
                        })
                    })
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn balance(&self, address: &Pubkey, limit: usize) -> Result<BalanceReport, TransportError> {
        let lamports = self.get_balance(address).await?;
        let recent = match self.recent_signatures(address, limit).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!(address = %address, error = %e, "Failed to fetch recent signatures");
                Vec::new()
            }
        };
        Ok(BalanceReport {
            address: address.to_string(),
            lamports,
            units: lamports_to_sol(lamports),
            recent,
        })
    }

    /// `getVoteAccounts`, current and delinquent
    pub async fn validators(&self) -> Result<ValidatorReport, TransportError> {
        let result = self.transport.call("getVoteAccounts", vec![]).await?;
        let rows = |key: &str, delinquent: bool| -> Vec<ValidatorRow> {
            result
                .get(key)
                .and_then(Value::as_array)
                .map(|entries| entries.iter().map(|v| validator_row(v, delinquent)).collect())
                .unwrap_or_default()
        };
        Ok(ValidatorReport {
            current: rows("current", false),
            delinquent: rows("delinquent", true),
        })
    }

    /// `getClusterNodes`
    pub async fn gossip_nodes(&self) -> Result<GossipReport, TransportError> {
        let result = self.transport.call("getClusterNodes", vec![]).await?;
        let nodes = result
            .as_array()
            .map(|nodes| nodes.iter().map(gossip_node).collect())
            .unwrap_or_default();
        Ok(GossipReport { nodes })
    }

    /// Node summary; never fails as a whole
    pub async fn network_info(&self, wallet: Option<&Pubkey>) -> NetworkInfo {
        let wallet_balance = match wallet {
            Some(address) => Some(
                self.get_balance(address)
                    .await
                    .map_err(|e| failed("balance", &e)),
            ),
            None => None,
        };

        let version = self
            .transport
            .call("getVersion", vec![])
            .await
            .map_err(|e| failed("version", &e))
            .and_then(|v| {
                v.get("solana-core")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| format!("Failed to retrieve version: unexpected result {}", v))
            });

        // An unhealthy node answers with an RPC error carrying the reason
        let health = match self.transport.call("getHealth", vec![]).await {
            Ok(v) => Ok(v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
            Err(TransportError::Rpc { message, .. }) => Ok(message),
            Err(e) => Err(failed("health", &e)),
        };

        let slot = self
            .transport
            .call("getSlot", vec![self.commitment_param()])
            .await
            .map_err(|e| failed("current slot", &e))
            .and_then(|v| {
                v.as_u64()
                    .ok_or_else(|| format!("Failed to retrieve current slot: unexpected result {}", v))
            });

        let block_time = match &slot {
            Ok(slot) => self
                .transport
                .call("getBlockTime", vec![json!(slot)])
                .await
                .map_err(|e| failed("block time", &e))
                .and_then(|v| {
                    v.as_i64()
                        .ok_or_else(|| "Failed to retrieve block time: not available".to_string())
                }),
            Err(_) => Err("Failed to retrieve block time: slot unknown".to_string()),
        };

        NetworkInfo {
            wallet_address: wallet.map(|w| w.to_string()),
            wallet_balance,
            rpc_url: self.transport.endpoint().to_string(),
            version,
            health,
            slot,
            block_time,
        }
    }

    /// Time `count` `getLatestBlockhash` round trips, `interval` apart
    pub async fn ping(&self, count: u32, interval: Duration) -> PingReport {
        let mut probes = Vec::new();
        for seq in 1..=count {
            let started = Instant::now();
            let probe = match self
                .transport
                .call("getLatestBlockhash", vec![self.commitment_param()])
                .await
            {
                Ok(_) => PingProbe {
                    seq,
                    latency_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
                    error: None,
                },
                Err(e) => PingProbe {
                    seq,
                    latency_ms: None,
                    error: Some(e.to_string()),
                },
            };
            debug!(seq, success = probe.success(), latency_ms = ?probe.latency_ms, "Ping probe");
            probes.push(probe);

            if seq < count && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }
        PingReport { probes }
    }
}

fn failed(what: &str, error: &TransportError) -> String {
    format!("Failed to retrieve {}: {}", what, error)
}

fn str_or_na(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
        Some(other) => other.to_string(),
    }
}

fn validator_row(value: &Value, delinquent: bool) -> ValidatorRow {
    ValidatorRow {
        identity: str_or_na(value, "nodePubkey"),
        vote_account: str_or_na(value, "votePubkey"),
        commission: value.get("commission").and_then(Value::as_u64),
        activated_stake: value.get("activatedStake").and_then(Value::as_u64).unwrap_or(0),
        last_vote: value.get("lastVote").and_then(Value::as_u64),
        epoch_credits: value
            .get("epochCredits")
            .and_then(Value::as_array)
            .and_then(|credits| credits.last())
            .and_then(|entry| entry.get(1))
            .and_then(Value::as_u64),
        delinquent,
    }
}

fn gossip_node(value: &Value) -> GossipNode {
    GossipNode {
        pubkey: str_or_na(value, "pubkey"),
        gossip: str_or_na(value, "gossip"),
        tpu: str_or_na(value, "tpu"),
        version: str_or_na(value, "version"),
    }
}

fn opt_or_na<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn either<T: fmt::Display>(value: &Result<T, String>) -> String {
    match value {
        Ok(v) => v.to_string(),
        Err(e) => e.clone(),
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Balance for {}: {:.9} {}", self.address, self.units, CURRENCY)?;
        writeln!(f)?;
        write!(f, "Recent Transactions:")?;
        if self.recent.is_empty() {
            write!(f, "\n  (none)")?;
        }
        for entry in &self.recent {
            write!(f, "\n  - Signature: {}, Slot: {}", entry.signature, entry.slot)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidatorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.current.is_empty() && self.delinquent.is_empty() {
            return write!(f, "No validators found.");
        }
        writeln!(
            f,
            "{:<44}  {:>10}  {:>22}  {:>12}  {:>14}",
            "Validator Identity",
            "Commission",
            format!("Activated Stake ({})", CURRENCY),
            "Last Vote",
            "Epoch Credits"
        )?;
        for row in self.current.iter().chain(&self.delinquent) {
            writeln!(
                f,
                "{:<44}  {:>10}  {:>22.2}  {:>12}  {:>14}{}",
                row.identity,
                opt_or_na(&row.commission.map(|c| format!("{}%", c))),
                lamports_to_sol(row.activated_stake),
                opt_or_na(&row.last_vote),
                opt_or_na(&row.epoch_credits),
                if row.delinquent { "  (delinquent)" } else { "" }
            )?;
        }
        write!(
            f,
            "\n{} current, {} delinquent",
            self.current.len(),
            self.delinquent.len()
        )
    }
}

impl fmt::Display for GossipReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<44}  {:<22}  {:<22}  {}", "Node", "Gossip", "TPU", "Version")?;
        for node in &self.nodes {
            write!(
                f,
                "\n{:<44}  {:<22}  {:<22}  {}",
                node.pubkey, node.gossip, node.tpu, node.version
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(address) = &self.wallet_address {
            writeln!(f, "{:<22} {}", "Wallet Address", address)?;
        }
        if let Some(balance) = &self.wallet_balance {
            let rendered = match balance {
                Ok(lamports) => format!("{:.9}", lamports_to_sol(*lamports)),
                Err(e) => e.clone(),
            };
            writeln!(f, "{:<22} {}", format!("Wallet Balance ({})", CURRENCY), rendered)?;
        }
        writeln!(f, "{:<22} {}", "RPC URL", self.rpc_url)?;
        writeln!(f, "{:<22} {}", "RPC Version", either(&self.version))?;
        writeln!(f, "{:<22} {}", "RPC Health", either(&self.health))?;
        writeln!(f, "{:<22} {}", "Current Slot", either(&self.slot))?;
        let block_time = match &self.block_time {
            Ok(t) => crate::decoder::format_block_time(*t),
            Err(e) => e.clone(),
        };
        write!(f, "{:<22} {}", "Current Block Time", block_time)
    }
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16}  {:<8}  {}", "Ping Test", "Status", "Time (ms)")?;
        for probe in &self.probes {
            let (status, time) = match probe.latency_ms {
                Some(ms) => ("Success", format!("{:.1}", ms)),
                None => ("Failed", NOT_AVAILABLE.to_string()),
            };
            write!(f, "\n{:<16}  {:<8}  {}", format!("Ping Test - {}", probe.seq), status, time)?;
        }
        match self.summary() {
            Some(s) => write!(
                f,
                "\n\n{}/{} succeeded, min/avg/max = {:.1}/{:.1}/{:.1} ms",
                s.succeeded, s.sent, s.min_ms, s.avg_ms, s.max_ms
            ),
            None => write!(f, "\n\nAll {} probes failed", self.probes.len()),
        }
    }
}
