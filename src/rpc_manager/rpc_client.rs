use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{RpcTransport, TransportError};

/// Requests are never pipelined, so a constant id is enough to pair them
const REQUEST_ID: u64 = 1;

/// HTTP(S) JSON-RPC transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpRpcTransport {
    http: Client,
    url: String,
    timeout: Duration,
}

impl HttpRpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Build the request envelope for `method`
pub fn envelope(method: &str, params: &[Value]) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": REQUEST_ID,
        "method": method,
        "params": params,
    })
}

/// Split a decoded response body into its `result` or a [`TransportError`]
pub fn parse_response(body: Value) -> Result<Value, TransportError> {
    let mut map = match body {
        Value::Object(map) => map,
        other => {
            return Err(TransportError::MalformedResponse(format!(
                "expected a JSON object, got: {}",
                other
            )))
        }
    };

    if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(TransportError::Rpc { code, message });
    }

    map.remove("result").ok_or_else(|| {
        TransportError::MalformedResponse("response carries neither `result` nor `error`".to_string())
    })
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let payload = envelope(method, &params);
        let started = Instant::now();

        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Network(format!(
                        "{} timed out after {}ms",
                        method,
                        self.timeout.as_millis()
                    ))
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint = %self.url, method, status = %status, "RPC HTTP error");
            return Err(TransportError::Network(format!(
                "HTTP {} from {}",
                status, self.url
            )));
        }

        // Body read failures are transport problems; decode failures are not
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        debug!(
            endpoint = %self.url,
            method,
            latency_ms = started.elapsed().as_millis() as u64,
            "RPC call completed"
        );

        parse_response(body)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let env = envelope("getBalance", &[json!("abc")]);
        assert_eq!(env["jsonrpc"], "2.0");
        assert_eq!(env["method"], "getBalance");
        assert_eq!(env["params"], json!(["abc"]));
        assert_eq!(env["id"], 1);
    }

    #[test]
    fn test_parse_result_verbatim() {
        let result = parse_response(json!({"jsonrpc": "2.0", "id": 1, "result": {"value": 42}}));
        assert_eq!(result.unwrap(), json!({"value": 42}));
    }

    #[test]
    fn test_parse_null_result() {
        let result = parse_response(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_rpc_error() {
        let err = parse_response(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Invalid param: WrongSize"}
        }))
        .unwrap_err();

        assert_eq!(
            err,
            TransportError::Rpc {
                code: -32602,
                message: "Invalid param: WrongSize".to_string()
            }
        );
    }

    #[test]
    fn test_parse_missing_result() {
        let err = parse_response(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));

        let err = parse_response(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));
    }
}
