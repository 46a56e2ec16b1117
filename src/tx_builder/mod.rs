//! Transaction Builder
//!
//! Builds, signs and submits value transfers for the cluster.
//!
//! ## Architecture
//!
//! - **errors**: `BuildError` / `SubmitError` taxonomy
//! - **instructions**: instruction helpers (system transfer)
//! - **message**: v0 message compilation, canonical account ordering, wire bytes
//! - **output**: signed transaction and its base-58 encoding
//! - **submit**: `sendTransaction` submission
//!
//! ## Pipeline
//!
//! ```text
//! Instruction(s) ──► MessageBuilder ──► UnsignedMessage
//!                      │ getLatestBlockhash
//!                      ▼
//!              TransactionSubmitter ──► SubmissionReceipt
//!                      │ sendTransaction
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use xolana_wallet::rpc_manager::RpcTransport;
//! # use xolana_wallet::wallet::WalletManager;
//! use xolana_wallet::tx_builder::{transfer, MessageBuilder, SendOptions, TransactionSubmitter};
//!
//! # async fn example(transport: Arc<dyn RpcTransport>, wallet: WalletManager) -> anyhow::Result<()> {
//! let recipient = solana_sdk::pubkey::Pubkey::new_unique();
//! let ix = transfer(&wallet.pubkey(), &recipient, 1_500_000_000);
//!
//! let builder = MessageBuilder::new(transport.clone(), "confirmed");
//! let (message, _anchor) = builder.compile(&wallet.pubkey(), &[ix]).await?;
//!
//! let submitter = TransactionSubmitter::new(transport, SendOptions::default());
//! let receipt = submitter.submit(message, &[&wallet]).await?;
//! println!("sent {}", receipt.signature);
//! # Ok(())
//! # }
//! ```

// Public API - Error types
pub mod errors;
pub use errors::{BuildError, SubmitError};

pub mod instructions;
pub mod message;
pub mod output;
pub mod submit;

// Re-export key types for convenience
pub use instructions::{plan_transfer, transfer};
pub use message::{compile_with_anchor, fetch_anchor, MessageBuilder, UnsignedMessage};
pub use output::SignedTransaction;
pub use submit::{SendOptions, TransactionSubmitter};
