//! Test Helper Utilities
//!
//! A scripted [`RpcTransport`] that answers each method from a queue and
//! records every call, plus common fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::config::Config;
use crate::rpc_manager::{RpcTransport, TransportError};

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Per-method response queues; the last queued response of a method repeats
/// once the queue drains to it
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, method: &str, response: Result<Value, TransportError>) -> &Self {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(&self, method: &str, result: Value) -> &Self {
        self.push(method, Ok(result))
    }

    pub fn err(&self, method: &str, error: TransportError) -> &Self {
        self.push(method, Err(error))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: method.to_string(),
            params,
        });

        let mut responses = self.responses.lock();
        let queue = responses.get_mut(method).ok_or_else(|| TransportError::Rpc {
            code: crate::rpc_manager::rpc_errors::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
        })?;
        match queue.len() {
            0 => Err(TransportError::MalformedResponse(format!("no scripted response for {}", method))),
            1 => queue.front().cloned().unwrap_or(Ok(Value::Null)),
            _ => queue.pop_front().unwrap_or(Ok(Value::Null)),
        }
    }

    fn endpoint(&self) -> &str {
        "scripted://local"
    }
}

/// `getLatestBlockhash` result carrying `hash`
pub fn blockhash_result(hash: &Hash) -> Value {
    json!({
        "context": {"slot": 100},
        "value": {"blockhash": hash.to_string(), "lastValidBlockHeight": 250}
    })
}

/// Minimal `getTransaction` result
pub fn transaction_result(signature: &str, err: Value) -> Value {
    json!({
        "slot": 321,
        "blockTime": 1_700_000_000,
        "confirmationStatus": "confirmed",
        "transaction": {
            "signatures": [signature],
            "message": {"accountKeys": [], "instructions": [], "recentBlockhash": "11111111111111111111111111111111"}
        },
        "meta": {"err": err, "fee": 5000, "preBalances": [10_000, 0], "postBalances": [5_000, 0], "rewards": []}
    })
}

/// Defaults with all waiting disabled
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.confirmation.settle_delay_ms = 0;
    config.confirmation.base_delay_ms = 1;
    config.confirmation.max_delay_ms = 2;
    config.confirmation.jitter_factor = 0.0;
    config.queries.ping_interval_ms = 0;
    config
}
