//! RPC Manager Module
//!
//! JSON-RPC 2.0 transport to a single configured endpoint.

use async_trait::async_trait;
use serde_json::Value;

// Submodules
pub mod rpc_client;
pub mod rpc_errors;

// Re-exports for convenience
pub use rpc_client::HttpRpcTransport;
pub use rpc_errors::{RetryPolicy, TransportError};

/// Generic remote-procedure transport
///
/// Implementations wrap `method`/`params` in a JSON-RPC envelope, send it, and
/// hand back the `result` payload verbatim. No domain validation happens here.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue a single call and return its `result` (which may be JSON `null`)
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

    /// Endpoint this transport talks to, for logs and reports
    fn endpoint(&self) -> &str;
}
