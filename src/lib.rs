//! Xolana Wallet - command-line wallet library for the X1 Xolana test network
//!
//! This library exposes the transaction pipeline, the RPC transport and the
//! read-only queries so the binary and integration tests share one code path.

pub mod commands;
pub mod config;
pub mod confirmation;
pub mod decoder;
pub mod queries;
pub mod rpc_manager;
pub mod structured_logging;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use commands::{Command, CommandOutput, WalletApp, WalletError};
pub use confirmation::{ConfirmationPolicy, ConfirmationResolver, TerminalOutcome};
pub use decoder::{decode, TransactionReport};
pub use rpc_manager::{HttpRpcTransport, RpcTransport, TransportError};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
