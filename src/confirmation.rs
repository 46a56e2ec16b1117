//! Confirmation resolution
//!
//! The network processes a submitted transaction on its own schedule, so a
//! single `getTransaction` returning `null` proves nothing. The resolver waits
//! a settle delay, then polls with bounded exponential backoff and only
//! reports `NotFound` once the whole attempt budget is spent.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ConfirmationConfig;
use crate::decoder::{decode, TransactionReport};
use crate::rpc_manager::{RetryPolicy, RpcTransport, TransportError};

/// Settle delay plus retry budget
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationPolicy {
    /// Wait before the first fetch (typical commit latency)
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl ConfirmationPolicy {
    /// One fetch, no waiting; used for looking up an arbitrary signature
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            retry: RetryPolicy::once(),
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            retry: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                base_delay_ms: config.base_delay_ms,
                max_delay_ms: config.max_delay_ms,
                jitter_factor: config.jitter_factor,
                multiplier: config.multiplier,
            },
        }
    }

    /// Upper bound on total waiting (settle delay + backoff sleeps)
    pub fn max_wait(&self) -> Duration {
        self.settle_delay + self.retry.max_total_delay()
    }
}

/// A fetched, non-null `getTransaction` result
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub signature: String,
    pub raw: Value,
}

impl TransactionRecord {
    pub fn report(&self) -> TransactionReport {
        let mut report = decode(&self.raw);
        if report.signature.is_none() {
            report.signature = Some(self.signature.clone());
        }
        report
    }

    /// `meta.err` rendered as JSON, when present and non-null
    pub fn error(&self) -> Option<&Value> {
        self.raw.pointer("/meta/err").filter(|e| !e.is_null())
    }
}

/// Final classification of a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    Confirmed(TransactionRecord),
    /// Processed with a non-null `meta.err`
    Failed(TransactionRecord),
    /// Still absent after the retry budget
    NotFound,
}

impl TerminalOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TerminalOutcome::Confirmed(_) => "confirmed",
            TerminalOutcome::Failed(_) => "failed",
            TerminalOutcome::NotFound => "not_found",
        }
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        match self {
            TerminalOutcome::Confirmed(r) | TerminalOutcome::Failed(r) => Some(r),
            TerminalOutcome::NotFound => None,
        }
    }
}

/// Classify a single `getTransaction` result
///
/// `meta.err` wins over any `confirmationStatus` the record may carry.
pub fn classify(signature: &str, raw: Value) -> TerminalOutcome {
    if raw.is_null() {
        return TerminalOutcome::NotFound;
    }
    let record = TransactionRecord {
        signature: signature.to_string(),
        raw,
    };
    if record.error().is_some() {
        TerminalOutcome::Failed(record)
    } else {
        TerminalOutcome::Confirmed(record)
    }
}

#[derive(Clone)]
pub struct ConfirmationResolver {
    transport: Arc<dyn RpcTransport>,
    policy: ConfirmationPolicy,
    commitment: String,
}

impl ConfirmationResolver {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        policy: ConfirmationPolicy,
        commitment: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            policy,
            commitment: commitment.into(),
        }
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Single `getTransaction` call
    pub async fn fetch(&self, signature: &str) -> Result<Value, TransportError> {
        self.transport
            .call(
                "getTransaction",
                vec![
                    json!(signature),
                    json!({
                        "encoding": "jsonParsed",
                        "maxSupportedTransactionVersion": 0,
                        "commitment": self.commitment,
                    }),
                ],
            )
            .await
    }

    /// Poll until the record appears or the budget is exhausted
    ///
    /// Retryable transport errors are absorbed while attempts remain; the
    /// error from the final attempt is returned as-is.
    pub async fn resolve(&self, signature: &str) -> Result<TerminalOutcome, TransportError> {
        if !self.policy.settle_delay.is_zero() {
            debug!(
                signature,
                settle_ms = self.policy.settle_delay.as_millis() as u64,
                "Waiting for transaction to settle"
            );
            tokio::time::sleep(self.policy.settle_delay).await;
        }

        let max_attempts = self.policy.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let last = attempt + 1 >= max_attempts;

            match self.fetch(signature).await {
                Ok(raw) if !raw.is_null() => {
                    let outcome = classify(signature, raw);
                    info!(
                        signature,
                        attempt = attempt + 1,
                        outcome = outcome.label(),
                        "Transaction resolved"
                    );
                    return Ok(outcome);
                }
                Ok(_) => {
                    debug!(signature, attempt = attempt + 1, "Transaction not visible yet");
                }
                Err(e) if !last && e.is_retryable() => {
                    warn!(
                        signature,
                        attempt = attempt + 1,
                        error = %e,
                        "getTransaction failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }

            if last {
                break;
            }
            if let Some(delay) = self.policy.retry.calculate_delay(attempt) {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }

        info!(signature, attempts = max_attempts, "Transaction not found within budget");
        Ok(TerminalOutcome::NotFound)
    }
}
