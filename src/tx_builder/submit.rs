//! Transaction submission
//!
//! Signs a compiled message, encodes it, and hands it to `sendTransaction`.
//! The wire bytes are complete before any network I/O, so a cancelled
//! submission either sent the whole transaction or nothing.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::rpc_manager::{RpcTransport, TransportError};
use crate::tx_builder::errors::SubmitError;
use crate::tx_builder::message::UnsignedMessage;
use crate::tx_builder::output::SignedTransaction;
use crate::types::SubmissionReceipt;
use crate::wallet::KeypairHandle;

/// Options forwarded to `sendTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: String,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: "confirmed".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct TransactionSubmitter {
    transport: Arc<dyn RpcTransport>,
    options: SendOptions,
}

impl TransactionSubmitter {
    pub fn new(transport: Arc<dyn RpcTransport>, options: SendOptions) -> Self {
        Self { transport, options }
    }

    /// Sign and send. Returns as soon as the node accepts the bytes.
    pub async fn submit(
        &self,
        message: UnsignedMessage,
        signers: &[&dyn KeypairHandle],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let tx = SignedTransaction::sign(message, signers)?;
        self.send(&tx).await
    }

    /// Send an already-signed transaction
    pub async fn send(&self, tx: &SignedTransaction) -> Result<SubmissionReceipt, SubmitError> {
        let encoded = tx.encode_base58()?;
        let params = vec![
            Value::String(encoded),
            json!({
                "encoding": "base58",
                "skipPreflight": self.options.skip_preflight,
                "preflightCommitment": self.options.preflight_commitment,
            }),
        ];

        let result = match self.transport.call("sendTransaction", params).await {
            Ok(result) => result,
            // No `result` at all is a rejection, not a transport fault
            Err(TransportError::MalformedResponse(detail)) => {
                return Err(SubmitError::Rejected(detail))
            }
            Err(e) => return Err(e.into()),
        };

        let signature = match result.as_str() {
            Some(sig) if !sig.is_empty() => sig.to_string(),
            _ => return Err(SubmitError::Rejected(result.to_string())),
        };

        let local = tx.signature().to_string();
        if signature != local {
            warn!(
                returned = %signature,
                local = %local,
                "Node returned a signature different from the fee payer's"
            );
        }

        info!(signature = %signature, "Transaction submitted");
        Ok(SubmissionReceipt { signature })
    }
}
