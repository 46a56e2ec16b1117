//! Command dispatch
//!
//! Every user-facing operation is a [`Command`] variant. [`WalletApp::execute`]
//! runs it against the pipeline and returns a [`CommandOutput`] value; only the
//! binary prints.

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;

use crate::config::{Config, MAX_PING_COUNT};
use crate::confirmation::{ConfirmationPolicy, ConfirmationResolver, TerminalOutcome};
use crate::decoder::TransactionReport;
use crate::queries::{BalanceReport, GossipReport, NetworkInfo, PingReport, QueryService, ValidatorReport};
use crate::rpc_manager::{RpcTransport, TransportError};
use crate::structured_logging::CommandContext;
use crate::tx_builder::{plan_transfer, BuildError, MessageBuilder, SendOptions, SubmitError, TransactionSubmitter};
use crate::types::{lamports_to_sol, parse_address, parse_sol_amount, AddressError, AmountError, CURRENCY};
use crate::wallet::{KeypairHandle, WalletManager};

/// Errors surfaced at the command boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("Invalid transaction signature '{0}'")]
    InvalidSignature(String),

    /// The command needs a keypair but none could be loaded
    #[error("No keypair loaded: {0}")]
    NoWallet(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl WalletError {
    /// Get the error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "address",
            Self::InvalidAmount(_) => "amount",
            Self::InvalidSignature(_) => "signature",
            Self::NoWallet(_) => "keystore",
            Self::Transport(e) => e.category(),
            Self::Build(e) => e.category(),
            Self::Submit(e) => e.category(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Balance of `address`, or of the loaded wallet
    Balance { address: Option<String> },
    /// Transfer `amount` display units to `recipient`
    Send {
        recipient: String,
        amount: String,
        wait: bool,
    },
    /// Look up and decode a transaction
    Tx { signature: String },
    Validators,
    Gossip,
    Ping { count: Option<u32> },
    Info,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Balance { .. } => "balance",
            Command::Send { .. } => "send",
            Command::Tx { .. } => "tx",
            Command::Validators => "validators",
            Command::Gossip => "gossip",
            Command::Ping { .. } => "ping",
            Command::Info => "info",
        }
    }
}

/// Where a transfer ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum TransferStatus {
    /// Sent without waiting for an outcome
    Submitted,
    Confirmed(TransactionReport),
    Failed(TransactionReport),
    NotFound,
}

impl From<TerminalOutcome> for TransferStatus {
    fn from(outcome: TerminalOutcome) -> Self {
        match outcome {
            TerminalOutcome::Confirmed(record) => TransferStatus::Confirmed(record.report()),
            TerminalOutcome::Failed(record) => TransferStatus::Failed(record.report()),
            TerminalOutcome::NotFound => TransferStatus::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub from: String,
    pub to: String,
    pub lamports: u64,
    pub signature: String,
    pub status: TransferStatus,
}

/// Result of `tx`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "lookup", rename_all = "snake_case")]
pub enum TransactionLookup {
    Found(TransactionReport),
    NotFound { signature: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", content = "output", rename_all = "snake_case")]
pub enum CommandOutput {
    Balance(BalanceReport),
    Transfer(TransferReport),
    Transaction(TransactionLookup),
    Validators(ValidatorReport),
    Gossip(GossipReport),
    Ping(PingReport),
    Info(NetworkInfo),
}

/// Everything a command needs: configuration, the endpoint, and optionally a wallet
pub struct WalletApp {
    config: Config,
    transport: Arc<dyn RpcTransport>,
    wallet: Option<WalletManager>,
    confirmation: ConfirmationPolicy,
}

impl WalletApp {
    pub fn new(config: Config, transport: Arc<dyn RpcTransport>, wallet: Option<WalletManager>) -> Self {
        let confirmation = ConfirmationPolicy::from_config(&config.confirmation);
        Self {
            config,
            transport,
            wallet,
            confirmation,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn wallet(&self) -> Option<&WalletManager> {
        self.wallet.as_ref()
    }

    fn require_wallet(&self) -> Result<&WalletManager, WalletError> {
        self.wallet.as_ref().ok_or_else(|| {
            WalletError::NoWallet(format!(
                "could not load {}",
                self.config.keypair_path().display()
            ))
        })
    }

    fn queries(&self) -> QueryService {
        QueryService::new(self.transport.clone(), self.config.rpc.commitment.clone())
    }

    /// Run `command` inside a span carrying the context's request id
    pub async fn execute(&self, command: Command, ctx: &CommandContext) -> Result<CommandOutput, WalletError> {
        let span = ctx.span();
        self.dispatch(command, ctx).instrument(span).await
    }

    async fn dispatch(&self, command: Command, ctx: &CommandContext) -> Result<CommandOutput, WalletError> {
        match command {
            Command::Balance { address } => {
                let address = match address {
                    Some(text) => parse_address(&text)?,
                    None => self.require_wallet()?.pubkey(),
                };
                let report = self
                    .queries()
                    .balance(&address, self.config.queries.recent_signatures_limit)
                    .await?;
                Ok(CommandOutput::Balance(report))
            }
            Command::Send {
                recipient,
                amount,
                wait,
            } => {
                let lamports = parse_sol_amount(&amount)?;
                let report = self.transfer(&recipient, lamports, wait, ctx).await?;
                Ok(CommandOutput::Transfer(report))
            }
            Command::Tx { signature } => Ok(CommandOutput::Transaction(self.lookup(&signature).await?)),
            Command::Validators => Ok(CommandOutput::Validators(self.queries().validators().await?)),
            Command::Gossip => Ok(CommandOutput::Gossip(self.queries().gossip_nodes().await?)),
            Command::Ping { count } => {
                let requested = count.unwrap_or(self.config.queries.ping_count);
                let count = requested.clamp(1, MAX_PING_COUNT);
                if count != requested {
                    ctx.logger.warn(&format!(
                        "ping count {} out of range, using {}",
                        requested, count
                    ));
                }
                let interval = Duration::from_millis(self.config.queries.ping_interval_ms);
                Ok(CommandOutput::Ping(self.queries().ping(count, interval).await))
            }
            Command::Info => {
                let wallet = self.wallet.as_ref().map(WalletManager::pubkey);
                Ok(CommandOutput::Info(self.queries().network_info(wallet.as_ref()).await))
            }
        }
    }

    /// Build, sign, submit and (optionally) resolve a transfer
    pub async fn transfer(
        &self,
        recipient: &str,
        lamports: u64,
        wait: bool,
        ctx: &CommandContext,
    ) -> Result<TransferReport, WalletError> {
        let wallet = self.require_wallet()?;
        let payer: Pubkey = wallet.pubkey();
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let instruction = plan_transfer(&payer, recipient, lamports)?;
        ctx.logger
            .log_transfer_attempt(&payer.to_string(), recipient.trim(), lamports);

        let builder = MessageBuilder::new(self.transport.clone(), self.config.rpc.commitment.clone());
        let (message, anchor) = builder.compile(&payer, &[instruction]).await.map_err(|e| {
            ctx.logger.log_failure("compile", &e.to_string(), elapsed_ms());
            e
        })?;
        tracing::debug!(blockhash = %anchor.blockhash, "Compiled transfer message");

        let submitter = TransactionSubmitter::new(
            self.transport.clone(),
            SendOptions {
                skip_preflight: self.config.transfer.skip_preflight,
                preflight_commitment: self.config.rpc.commitment.clone(),
            },
        );
        let signers: [&dyn KeypairHandle; 1] = [wallet];
        let receipt = submitter.submit(message, &signers).await.map_err(|e| {
            ctx.logger.log_failure("submit", &e.to_string(), elapsed_ms());
            e
        })?;
        ctx.logger.log_submission(&receipt.signature, elapsed_ms());

        let status = if wait {
            let resolver = ConfirmationResolver::new(
                self.transport.clone(),
                self.confirmation.clone(),
                self.config.rpc.commitment.clone(),
            );
            let outcome = resolver.resolve(&receipt.signature).await.map_err(|e| {
                ctx.logger.log_failure("confirm", &e.to_string(), elapsed_ms());
                e
            })?;
            ctx.logger
                .log_outcome(&receipt.signature, outcome.label(), elapsed_ms());
            TransferStatus::from(outcome)
        } else {
            TransferStatus::Submitted
        };

        Ok(TransferReport {
            from: payer.to_string(),
            to: recipient.trim().to_string(),
            lamports,
            signature: receipt.signature,
            status,
        })
    }

    /// Single immediate `getTransaction`; absence is a result, not an error
    pub async fn lookup(&self, signature: &str) -> Result<TransactionLookup, WalletError> {
        let signature = signature.trim();
        Signature::from_str(signature).map_err(|_| WalletError::InvalidSignature(signature.to_string()))?;

        let resolver = ConfirmationResolver::new(
            self.transport.clone(),
            ConfirmationPolicy::immediate(),
            self.config.rpc.commitment.clone(),
        );
        Ok(match resolver.resolve(signature).await? {
            TerminalOutcome::Confirmed(record) | TerminalOutcome::Failed(record) => {
                TransactionLookup::Found(record.report())
            }
            TerminalOutcome::NotFound => TransactionLookup::NotFound {
                signature: signature.to_string(),
            },
        })
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transaction sent: {:.9} {} from {} to {}",
            lamports_to_sol(self.lamports),
            CURRENCY,
            self.from,
            self.to
        )?;
        write!(f, "Signature: {}", self.signature)?;
        match &self.status {
            TransferStatus::Submitted => write!(f, "\nNot waiting for confirmation."),
            TransferStatus::Confirmed(report) => write!(f, "\n\nConfirmed.\n\n{}", report),
            TransferStatus::Failed(report) => write!(f, "\n\nFailed on chain.\n\n{}", report),
            TransferStatus::NotFound => write!(
                f,
                "\n\nTransaction not found or not confirmed yet. Check it later with `tx {}`.",
                self.signature
            ),
        }
    }
}

impl fmt::Display for TransactionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionLookup::Found(report) => write!(f, "{}", report),
            TransactionLookup::NotFound { signature } => write!(
                f,
                "Transaction {} not found or not confirmed. Please check the signature and try again.",
                signature
            ),
        }
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Balance(r) => write!(f, "{}", r),
            CommandOutput::Transfer(r) => write!(f, "{}", r),
            CommandOutput::Transaction(r) => write!(f, "{}", r),
            CommandOutput::Validators(r) => write!(f, "{}", r),
            CommandOutput::Gossip(r) => write!(f, "{}", r),
            CommandOutput::Ping(r) => write!(f, "{}", r),
            CommandOutput::Info(r) => write!(f, "{}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Validators.name(), "validators");
        assert_eq!(
            Command::Send {
                recipient: String::new(),
                amount: String::new(),
                wait: true
            }
            .name(),
            "send"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(WalletError::NoWallet("x".into()).category(), "keystore");
        assert_eq!(
            WalletError::Submit(SubmitError::Rejected("null".into())).category(),
            "rejected"
        );
        assert_eq!(
            WalletError::Transport(TransportError::Network("down".into())).category(),
            TransportError::Network("down".into()).category()
        );
    }

    #[test]
    fn test_not_found_display() {
        let lookup = TransactionLookup::NotFound {
            signature: "5abc".into(),
        };
        assert!(lookup.to_string().contains("5abc not found"));
    }
}
